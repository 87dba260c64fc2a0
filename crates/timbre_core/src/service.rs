//! Filter Design Service
//!
//! Memoizing facade over a [`DesignFilter`]. Designs are pure functions of
//! their specification, so a cached result is shared by every caller that
//! asks for the same specification content.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use timbre_dsp::{
    DesignFilter, DesignerConfig, DigitalFilter, DspResult, FilterCoefficients, FilterDesigner,
    FilterSpecification,
};
use tracing::{debug, info};

/// Snapshot of the design cache counters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits as a percentage of lookups, rounded to two decimals
    pub hit_rate_percent: f64,
}

#[derive(Default)]
struct DesignCache {
    entries: HashMap<FilterSpecification, Arc<FilterCoefficients>>,
    hits: u64,
    misses: u64,
}

impl DesignCache {
    fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64 * 100.0
        };
        CacheStats {
            cache_size: self.entries.len(),
            cache_hits: self.hits,
            cache_misses: self.misses,
            hit_rate_percent: (hit_rate * 100.0).round() / 100.0,
        }
    }
}

/// Caching filter design service, safe to share between threads
pub struct FilterDesignService<D: DesignFilter = FilterDesigner> {
    designer: D,
    cache: Mutex<DesignCache>,
}

impl FilterDesignService<FilterDesigner> {
    pub fn new() -> Self {
        Self::with_designer(FilterDesigner::new())
    }

    pub fn from_config(config: DesignerConfig) -> Self {
        Self::with_designer(FilterDesigner::with_config(config))
    }
}

impl Default for FilterDesignService<FilterDesigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DesignFilter> FilterDesignService<D> {
    pub fn with_designer(designer: D) -> Self {
        Self {
            designer,
            cache: Mutex::new(DesignCache::default()),
        }
    }

    pub fn designer(&self) -> &D {
        &self.designer
    }

    /// Cached coefficients for `spec`, designing them on first request
    ///
    /// The lock is held across the design so concurrent requests for the
    /// same specification compute it once. Failed designs are not cached
    /// but still count as misses.
    pub fn get_or_create(&self, spec: &FilterSpecification) -> DspResult<Arc<FilterCoefficients>> {
        let mut cache = self.cache.lock();
        if let Some(coefficients) = cache.entries.get(spec) {
            let coefficients = Arc::clone(coefficients);
            cache.hits += 1;
            debug!(
                "Filter cache hit: {} {} order {}",
                spec.filter_type(),
                spec.response(),
                spec.order()
            );
            return Ok(coefficients);
        }

        cache.misses += 1;
        debug!(
            "Filter cache miss: {} {} order {}",
            spec.filter_type(),
            spec.response(),
            spec.order()
        );
        let coefficients = Arc::new(self.designer.design(spec)?);
        cache.entries.insert(spec.clone(), Arc::clone(&coefficients));
        Ok(coefficients)
    }

    /// A new filter with its own state, running the cached design
    pub fn create_filter(&self, spec: &FilterSpecification) -> DspResult<DigitalFilter> {
        Ok(DigitalFilter::new(self.get_or_create(spec)?))
    }

    pub fn estimate_order(&self, spec: &FilterSpecification) -> u32 {
        self.designer.estimate_order(spec)
    }

    pub fn validate(&self, spec: &FilterSpecification) -> bool {
        self.designer.validate(spec)
    }

    /// Empty the cache and zero the counters, returning what they were
    pub fn clear_cache(&self) -> CacheStats {
        let mut cache = self.cache.lock();
        let previous = cache.stats();
        *cache = DesignCache::default();
        info!(
            "Filter cache cleared: {} entries, {} hits, {} misses",
            previous.cache_size, previous.cache_hits, previous.cache_misses
        );
        previous
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use timbre_dsp::{DspError, FilterResponse, FilterType};

    fn lowpass(order: u32) -> FilterSpecification {
        FilterSpecification::new(
            FilterType::Butterworth,
            FilterResponse::Lowpass,
            &[1000.0],
            48000.0,
            order,
        )
        .unwrap()
    }

    /// Designer that counts how often it is asked to design
    #[derive(Default)]
    struct CountingDesigner {
        inner: FilterDesigner,
        calls: AtomicUsize,
    }

    impl DesignFilter for CountingDesigner {
        fn design(&self, spec: &FilterSpecification) -> DspResult<FilterCoefficients> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.design(spec)
        }

        fn validate(&self, spec: &FilterSpecification) -> bool {
            self.inner.validate(spec)
        }

        fn estimate_order(&self, spec: &FilterSpecification) -> u32 {
            self.inner.estimate_order(spec)
        }
    }

    #[test]
    fn test_second_lookup_hits_cache() {
        let service = FilterDesignService::with_designer(CountingDesigner::default());

        let first = service.get_or_create(&lowpass(4)).unwrap();
        // Equal content, separate value
        let second = service.get_or_create(&lowpass(4)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.designer().calls.load(Ordering::SeqCst), 1);

        let stats = service.get_cache_stats();
        assert_eq!(stats.cache_size, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.hit_rate_percent, 50.0);
    }

    #[test]
    fn test_distinct_specs_are_distinct_entries() {
        let service = FilterDesignService::new();
        service.get_or_create(&lowpass(2)).unwrap();
        service.get_or_create(&lowpass(4)).unwrap();
        service
            .get_or_create(&lowpass(4).with_ripple_db(1.0))
            .unwrap();

        assert_eq!(service.get_cache_stats().cache_size, 3);
        assert_eq!(service.get_cache_stats().cache_hits, 0);
    }

    #[test]
    fn test_hit_rate_rounding() {
        let service = FilterDesignService::new();
        for _ in 0..3 {
            service.get_or_create(&lowpass(4)).unwrap();
        }
        // 2 of 3 lookups hit
        assert_eq!(service.get_cache_stats().hit_rate_percent, 66.67);
    }

    #[test]
    fn test_clear_cache_returns_prior_stats() {
        let service = FilterDesignService::new();
        service.get_or_create(&lowpass(4)).unwrap();
        service.get_or_create(&lowpass(4)).unwrap();

        let previous = service.clear_cache();
        assert_eq!(previous.cache_size, 1);
        assert_eq!(previous.cache_hits, 1);

        assert_eq!(service.get_cache_stats(), CacheStats::default());
    }

    #[test]
    fn test_failed_design_not_cached() {
        let service = FilterDesignService::from_config(DesignerConfig::strict());
        let err = service.get_or_create(&lowpass(4)).unwrap_err();
        assert!(matches!(err, DspError::FilterInstability { .. }));
        assert!(err.is_retryable());

        let stats = service.get_cache_stats();
        assert_eq!(stats.cache_size, 0);
        assert_eq!(stats.cache_misses, 1);
    }

    #[test]
    fn test_create_filter_shares_coefficients() {
        let service = FilterDesignService::new();
        let a = service.create_filter(&lowpass(4)).unwrap();
        let b = service.create_filter(&lowpass(4)).unwrap();
        assert!(Arc::ptr_eq(a.coefficients(), b.coefficients()));
        assert_eq!(a.order(), 4);
    }

    #[test]
    fn test_estimate_order_passthrough() {
        let service = FilterDesignService::new();
        let spec = lowpass(4);
        assert_eq!(
            service.estimate_order(&spec),
            FilterDesigner::new().estimate_order(&spec)
        );
        assert!(service.validate(&spec));
    }

    #[test]
    fn test_concurrent_lookups() {
        let service = Arc::new(FilterDesignService::with_designer(CountingDesigner::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.get_or_create(&lowpass(6)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.designer().calls.load(Ordering::SeqCst), 1);
        let stats = service.get_cache_stats();
        assert_eq!(stats.cache_hits + stats.cache_misses, 8);
        assert_eq!(stats.cache_misses, 1);
    }
}
