//! Multi-family hyperparameter search and best-model selection

use std::time::Instant;

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::{ModelCandidate, ModelFamily};
use super::cross_validation::{CvResults, StratifiedKFold};
use super::models::{Estimator, TrainedModel};
use super::params::{describe, ParamSet};
use crate::error::{PipelineError, Result};
use crate::metrics::{accuracy, score};

/// Outcome of searching one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyScore {
    pub family: ModelFamily,
    /// F1 of the refit model on the held-out split
    pub test_f1: f64,
    /// Mean CV accuracy of the chosen configuration; absent when the grid is empty
    pub cv_score: Option<f64>,
    pub best_params: ParamSet,
    pub n_configs: usize,
    pub fit_time_secs: f64,
}

impl FamilyScore {
    pub fn new(family: ModelFamily, test_f1: f64) -> Self {
        Self {
            family,
            test_f1,
            cv_score: None,
            best_params: ParamSet::new(),
            n_configs: 1,
            fit_time_secs: 0.0,
        }
    }
}

/// Held-out scores of every family, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResult {
    scores: Vec<FamilyScore>,
}

impl SearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, score: FamilyScore) {
        self.scores.push(score);
    }

    pub fn get(&self, family: ModelFamily) -> Option<&FamilyScore> {
        self.scores.iter().find(|s| s.family == family)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FamilyScore> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// See [`select_best`].
    pub fn best(&self) -> Option<&FamilyScore> {
        select_best(&self.scores)
    }
}

impl FromIterator<FamilyScore> for SearchResult {
    fn from_iter<I: IntoIterator<Item = FamilyScore>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Highest held-out F1 wins. Exact ties go to the family listed first.
pub fn select_best(scores: &[FamilyScore]) -> Option<&FamilyScore> {
    best_index(scores).map(|i| &scores[i])
}

fn best_index(scores: &[FamilyScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scores.iter().enumerate() {
        if best.map_or(true, |b| s.test_f1 > scores[b].test_f1) {
            best = Some(i);
        }
    }
    best
}

/// Result of a full search: the scores, the winner and its refit model.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: SearchResult,
    pub best_family: ModelFamily,
    pub best_model: TrainedModel,
}

/// Grid search over a catalog of families.
///
/// Each family's grid is scored by stratified k-fold accuracy on the train
/// split. The best configuration is refit on the full train split and scored
/// by F1 on the test split; that score ranks the families.
#[derive(Debug, Clone)]
pub struct ModelSearchEngine {
    catalog: Vec<ModelCandidate>,
    cv: StratifiedKFold,
    random_state: u64,
}

impl ModelSearchEngine {
    pub fn new(catalog: Vec<ModelCandidate>) -> Self {
        Self {
            catalog,
            cv: StratifiedKFold::default(),
            random_state: 42,
        }
    }

    pub fn with_cv_folds(mut self, n_splits: usize) -> Self {
        self.cv = StratifiedKFold::new(n_splits);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn catalog(&self) -> &[ModelCandidate] {
        &self.catalog
    }

    pub fn search(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<SearchOutcome> {
        if self.catalog.is_empty() {
            return Err(PipelineError::Config("model catalog is empty".to_string()));
        }

        let mut result = SearchResult::new();
        let mut models = Vec::with_capacity(self.catalog.len());

        for candidate in &self.catalog {
            let family = candidate.family;
            let (family_score, model) = self
                .search_family(candidate, x_train, y_train, x_test, y_test)
                .map_err(|e| PipelineError::Search {
                    family: family.name().to_string(),
                    reason: e.to_string(),
                })?;

            info!(
                family = %family,
                test_f1 = family_score.test_f1,
                cv_score = ?family_score.cv_score,
                params = %describe(&family_score.best_params),
                "Family searched"
            );
            result.push(family_score);
            models.push(model);
        }

        let best_idx = best_index(&result.scores).unwrap_or(0);
        let best_family = self.catalog[best_idx].family;
        let best_model = models.swap_remove(best_idx);

        info!(family = %best_family, "Best model selected");
        Ok(SearchOutcome {
            result,
            best_family,
            best_model,
        })
    }

    fn search_family(
        &self,
        candidate: &ModelCandidate,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(FamilyScore, TrainedModel)> {
        let start = Instant::now();
        let configs = candidate.grid.expand()?;

        let (best_params, cv_score) = if candidate.grid.is_empty() {
            (ParamSet::new(), None)
        } else {
            let (params, cv) = self.grid_search(candidate.family, &configs, x_train, y_train)?;
            (params, Some(cv))
        };

        let mut model = candidate.family.build(&best_params, self.random_state)?;
        model.fit(x_train, y_train)?;
        let test_f1 = score(y_test, &model.predict(x_test)?)?.f1_score;

        Ok((
            FamilyScore {
                family: candidate.family,
                test_f1,
                cv_score,
                best_params,
                n_configs: configs.len(),
                fit_time_secs: start.elapsed().as_secs_f64(),
            },
            model,
        ))
    }

    /// Best configuration by mean CV accuracy; the earliest one wins ties.
    fn grid_search(
        &self,
        family: ModelFamily,
        configs: &[ParamSet],
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(ParamSet, f64)> {
        let splits = self.cv.split(y)?;
        let n_folds = splits.len();

        let jobs: Vec<(usize, usize)> = (0..configs.len())
            .flat_map(|c| (0..n_folds).map(move |f| (c, f)))
            .collect();

        let fold_scores = jobs
            .par_iter()
            .map(|&(c, f)| {
                let split = &splits[f];
                let x_fit = x.select(Axis(0), &split.train_indices);
                let y_fit = y.select(Axis(0), &split.train_indices);
                let x_val = x.select(Axis(0), &split.test_indices);
                let y_val = y.select(Axis(0), &split.test_indices);

                let mut model = family.build(&configs[c], self.random_state)?;
                model.fit(&x_fit, &y_fit)?;
                accuracy(&y_val, &model.predict(&x_val)?)
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut best: Option<(usize, f64)> = None;
        for (c, chunk) in fold_scores.chunks(n_folds).enumerate() {
            let cv = CvResults::from_scores(chunk.to_vec());
            debug!(
                family = %family,
                params = %describe(&configs[c]),
                mean = cv.mean_score,
                std = cv.std_score,
                "Grid point scored"
            );
            if best.map_or(true, |(_, b)| cv.mean_score > b) {
                best = Some((c, cv.mean_score));
            }
        }

        let (c, mean) = best.ok_or_else(|| PipelineError::Config("empty grid".to_string()))?;
        Ok((configs[c].clone(), mean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::catalog::default_catalog;
    use crate::training::params::ParamGrid;

    fn score_of(family: ModelFamily, f1: f64) -> FamilyScore {
        FamilyScore::new(family, f1)
    }

    #[test]
    fn test_select_best_highest_score() {
        let scores = vec![
            score_of(ModelFamily::RandomForest, 0.91),
            score_of(ModelFamily::GradientBoosting, 0.93),
        ];
        assert_eq!(select_best(&scores).unwrap().family, ModelFamily::GradientBoosting);
    }

    #[test]
    fn test_select_best_tie_goes_to_first() {
        let scores = vec![
            score_of(ModelFamily::KNeighbors, 0.9),
            score_of(ModelFamily::DecisionTree, 0.9),
        ];
        assert_eq!(select_best(&scores).unwrap().family, ModelFamily::KNeighbors);
        assert!(select_best(&[]).is_none());
    }

    fn dataset(n: usize, offset: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let k = i + offset;
            let label = (k % 2) as f64;
            label * 2.0 - 1.0 + ((k * 7 + j * 5) % 11) as f64 * 0.05
        });
        let y = Array1::from_shape_fn(n, |i| ((i + offset) % 2) as f64);
        (x, y)
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x_train, y_train) = dataset(60, 0);
        let (x_test, y_test) = dataset(20, 60);

        let catalog: Vec<ModelCandidate> = default_catalog()
            .into_iter()
            .filter(|c| matches!(c.family, ModelFamily::DecisionTree | ModelFamily::RandomForest))
            .collect();
        let engine = ModelSearchEngine::new(catalog);

        let first = engine.search(&x_train, &y_train, &x_test, &y_test).unwrap();
        let second = engine.search(&x_train, &y_train, &x_test, &y_test).unwrap();

        assert_eq!(first.best_family, second.best_family);
        let strip = |r: &SearchResult| -> Vec<(ModelFamily, f64, ParamSet)> {
            r.iter().map(|s| (s.family, s.test_f1, s.best_params.clone())).collect()
        };
        assert_eq!(strip(&first.result), strip(&second.result));
        // separable data, both families are perfect, first in catalog order wins
        assert_eq!(first.best_family, ModelFamily::RandomForest);
    }

    #[test]
    fn test_empty_grid_fits_defaults() {
        let (x_train, y_train) = dataset(30, 0);
        let (x_test, y_test) = dataset(10, 30);
        let engine = ModelSearchEngine::new(vec![ModelCandidate::new(
            ModelFamily::LogisticRegression,
            ParamGrid::new(),
        )]);

        let outcome = engine.search(&x_train, &y_train, &x_test, &y_test).unwrap();
        let family_score = outcome.result.get(ModelFamily::LogisticRegression).unwrap();
        assert!(family_score.cv_score.is_none());
        assert!(family_score.best_params.is_empty());
    }

    #[test]
    fn test_family_failure_is_search_error() {
        let (x_train, y_train) = dataset(30, 0);
        let (x_test, y_test) = dataset(10, 30);
        let engine = ModelSearchEngine::new(vec![ModelCandidate::new(
            ModelFamily::KNeighbors,
            ParamGrid::new().with("n_neighbors", vec![0i64]),
        )]);

        match engine.search(&x_train, &y_train, &x_test, &y_test) {
            Err(PipelineError::Search { family, .. }) => assert_eq!(family, "KNN"),
            other => panic!("expected search error, got {:?}", other.map(|o| o.best_family)),
        }
    }
}
