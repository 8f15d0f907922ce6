//! Balancer algorithm registry
//!
//! A fixed, ordered list of the built-in algorithms. The first entry is the
//! default. Registration happens here at compile time; there is no runtime
//! registration API.

use crate::{adaptive, aimd, fixed, AlgorithmConfig, Balancer, BalancerError};

type BuildFn = fn(&AlgorithmConfig) -> Result<Box<dyn Balancer>, BalancerError>;

/// Registry entry for one algorithm.
pub struct AlgorithmDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    build: BuildFn,
}

impl AlgorithmDescriptor {
    /// Create a fresh state for this algorithm.
    pub fn init(&self, config: &AlgorithmConfig) -> Result<Box<dyn Balancer>, BalancerError> {
        (self.build)(config)
    }
}

impl std::fmt::Debug for AlgorithmDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

// First entry is the default
static ALGORITHMS: &[AlgorithmDescriptor] = &[
    AlgorithmDescriptor {
        name: "adaptive",
        description: "RTT and buffer-based adaptive control (default)",
        build: adaptive::build,
    },
    AlgorithmDescriptor {
        name: "aimd",
        description: "additive increase, multiplicative decrease (TCP-style)",
        build: aimd::build,
    },
    AlgorithmDescriptor {
        name: "fixed",
        description: "constant bitrate, no adaptation",
        build: fixed::build,
    },
];

/// The algorithm used when none is configured.
pub fn default_algorithm() -> &'static AlgorithmDescriptor {
    &ALGORITHMS[0]
}

/// Case-sensitive lookup by name.
pub fn find(name: &str) -> Option<&'static AlgorithmDescriptor> {
    ALGORITHMS.iter().find(|a| a.name == name)
}

/// All registered algorithms, in registration order.
pub fn all() -> &'static [AlgorithmDescriptor] {
    ALGORITHMS
}

/// Multi-line listing used by the CLI help and error output.
pub fn available_summary() -> String {
    let mut out = String::from("Available balancer algorithms:\n");
    for algo in ALGORITHMS {
        out.push_str(&format!("  {:<12} - {}\n", algo.name, algo.description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first() {
        assert_eq!(default_algorithm().name, all()[0].name);
        assert_eq!(default_algorithm().name, "adaptive");
    }

    #[test]
    fn test_find_known_algorithms() {
        for name in ["adaptive", "aimd", "fixed"] {
            assert!(find(name).is_some(), "missing algorithm {name}");
        }
    }

    #[test]
    fn test_find_is_case_sensitive() {
        assert!(find("Adaptive").is_none());
        assert!(find("AIMD").is_none());
    }

    #[test]
    fn test_find_unknown_returns_none() {
        assert!(find("bbr").is_none());
    }

    #[test]
    fn test_names_are_unique_and_order_stable() {
        let names: Vec<_> = all().iter().map(|a| a.name).collect();
        assert_eq!(names, ["adaptive", "aimd", "fixed"]);
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names, deduped);
    }

    #[test]
    fn test_summary_lists_every_algorithm() {
        let summary = available_summary();
        for algo in all() {
            assert!(summary.contains(algo.name));
        }
    }
}
