//! Named collection of filters run in series or in parallel

use std::collections::HashMap;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};
use crate::filter::DigitalFilter;

/// How a bank combines its filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankMode {
    /// Each filter feeds the next, in insertion order
    #[default]
    Series,
    /// Every filter sees the original input; outputs are averaged
    Parallel,
}

/// Filters keyed by id, processed in insertion order
///
/// Re-adding an existing id replaces the filter in place; removing and
/// adding again moves it to the end.
#[derive(Default)]
pub struct FilterBank {
    filters: HashMap<String, DigitalFilter>,
    order: Vec<String>,
}

impl FilterBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: impl Into<String>, filter: DigitalFilter) {
        let id = id.into();
        if self.filters.insert(id.clone(), filter).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a filter; returns whether it was present
    pub fn remove(&mut self, id: &str) -> bool {
        if self.filters.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }

    pub fn get(&self, id: &str) -> Option<&DigitalFilter> {
        self.filters.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DigitalFilter> {
        self.filters.get_mut(id)
    }

    /// Ids in processing order
    pub fn filter_ids(&self) -> &[String] {
        &self.order
    }

    /// Filters in processing order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DigitalFilter)> {
        self.order
            .iter()
            .filter_map(|id| self.filters.get(id).map(|f| (id.as_str(), f)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn process(&mut self, samples: &ArrayD<f64>, mode: BankMode) -> DspResult<ArrayD<f64>> {
        if self.is_empty() {
            return Ok(samples.clone());
        }
        match mode {
            BankMode::Series => self.process_series(samples),
            BankMode::Parallel => self.process_parallel(samples),
        }
    }

    fn process_series(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        let mut signal = samples.clone();
        for id in &self.order {
            let filter = self.filters.get_mut(id).ok_or_else(|| missing(id))?;
            signal = filter.process(&signal)?;
        }
        Ok(signal)
    }

    fn process_parallel(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        let mut sum = ArrayD::<f64>::zeros(samples.raw_dim());
        for id in &self.order {
            let filter = self.filters.get_mut(id).ok_or_else(|| missing(id))?;
            sum += &filter.process(samples)?;
        }
        Ok(sum / self.order.len() as f64)
    }

    pub fn reset_all(&mut self) {
        for filter in self.filters.values_mut() {
            filter.reset_state();
        }
    }
}

fn missing(id: &str) -> DspError {
    DspError::FilterProcessing(format!("filter '{id}' is listed but not stored"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{
        DesignFilter, FilterCoefficients, FilterDesigner, FilterResponse, FilterSpecification,
        FilterType,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};

    fn butterworth() -> FilterCoefficients {
        let spec = FilterSpecification::new(
            FilterType::Butterworth,
            FilterResponse::Lowpass,
            &[2000.0],
            48000.0,
            4,
        )
        .unwrap();
        FilterDesigner::new().design(&spec).unwrap()
    }

    fn chirp(n: usize) -> ArrayD<f64> {
        Array1::from_shape_fn(n, |i| (0.0005 * (i * i) as f64).sin()).into_dyn()
    }

    fn gain(g: f64) -> DigitalFilter {
        DigitalFilter::new(FilterCoefficients::fir(vec![g]).unwrap())
    }

    fn ones(n: usize) -> ArrayD<f64> {
        Array1::from(vec![1.0; n]).into_dyn()
    }

    #[test]
    fn test_empty_bank_passes_through() {
        let mut bank = FilterBank::new();
        assert!(bank.is_empty());
        let input = ones(4);
        assert_eq!(bank.process(&input, BankMode::Series).unwrap(), input);
        assert_eq!(bank.process(&input, BankMode::Parallel).unwrap(), input);
    }

    #[test]
    fn test_series_multiplies() {
        let mut bank = FilterBank::new();
        bank.add("double", gain(2.0));
        bank.add("triple", gain(3.0));
        let out = bank.process(&ones(3), BankMode::Series).unwrap();
        assert!(out.iter().all(|&y| y == 6.0));
    }

    #[test]
    fn test_parallel_averages() {
        let mut bank = FilterBank::new();
        bank.add("double", gain(2.0));
        bank.add("quad", gain(4.0));
        let out = bank.process(&ones(3), BankMode::Parallel).unwrap();
        assert!(out.iter().all(|&y| y == 3.0));

        let stereo = Array2::<f64>::ones((5, 2)).into_dyn();
        let out = bank.process(&stereo, BankMode::Parallel).unwrap();
        assert_eq!(out.shape(), &[5, 2]);
    }

    #[test]
    fn test_single_filter_series_matches_filter() {
        let mut bank = FilterBank::new();
        bank.add("lp", DigitalFilter::new(butterworth()));
        let mut alone = DigitalFilter::new(butterworth());

        let input = chirp(512);
        assert_eq!(
            bank.process(&input, BankMode::Series).unwrap(),
            alone.process(&input).unwrap()
        );
    }

    #[test]
    fn test_parallel_identical_filters_match_one() {
        let mut bank = FilterBank::new();
        for id in ["a", "b", "c"] {
            bank.add(id, DigitalFilter::new(butterworth()));
        }
        let mut alone = DigitalFilter::new(butterworth());

        let input = chirp(512);
        let combined = bank.process(&input, BankMode::Parallel).unwrap();
        let expected = alone.process(&input).unwrap();
        for (y, e) in combined.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*y, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_order_preserved_and_replaced_in_place() {
        let mut bank = FilterBank::new();
        bank.add("a", gain(1.0));
        bank.add("b", gain(1.0));
        bank.add("c", gain(1.0));
        bank.add("a", gain(5.0));
        assert_eq!(bank.filter_ids(), &["a", "b", "c"]);
        assert_eq!(bank.len(), 3);

        assert!(bank.remove("a"));
        assert!(!bank.remove("a"));
        bank.add("a", gain(1.0));
        assert_eq!(bank.filter_ids(), &["b", "c", "a"]);

        let ids: Vec<&str> = bank.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_errors_propagate() {
        let mut bank = FilterBank::new();
        bank.add("unity", gain(1.0));
        let cube = ArrayD::<f64>::zeros(ndarray::IxDyn(&[2, 2, 2]));
        let err = bank.process(&cube, BankMode::Series).unwrap_err();
        assert!(matches!(err, DspError::UnsupportedShape(_)));
    }

    #[test]
    fn test_reset_all() {
        let mut bank = FilterBank::new();
        let one_pole = FilterCoefficients::new(vec![1.0], vec![1.0, -0.5]).unwrap();
        bank.add("pole", DigitalFilter::new(one_pole));

        let first = bank.process(&ones(4), BankMode::Series).unwrap();
        let carried = bank.process(&ones(4), BankMode::Series).unwrap();
        assert_ne!(first, carried);

        bank.reset_all();
        assert_eq!(bank.process(&ones(4), BankMode::Series).unwrap(), first);
    }
}
