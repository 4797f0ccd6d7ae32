//! Detector subsets ("networks") evaluated by the analyzer.
//!
//! Subsets are requested either explicitly, as a JSON list of index lists
//! (`[[0,1],[0],[1]]`), or with `all`, which expands to every non-empty subset.
//! Both forms resolve into the same `Vec<NetworkSubset>` before analysis.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CbcError;

/// Every non-empty subset of `{0, .., n-1}`.
///
/// Ordered by size, then lexicographically by index within a size, e.g.
/// `powerset(3) = [0] [1] [2] [0,1] [0,2] [1,2] [0,1,2]`.
pub fn powerset(n: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::with_capacity((1usize << n.min(usize::BITS as usize - 1)) - 1);
    for size in 1..=n {
        // Lexicographic k-combinations: advance the rightmost index that can move.
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            out.push(combo.clone());

            let Some(i) = (0..size).rev().find(|&i| combo[i] < n - size + i) else {
                break;
            };
            combo[i] += 1;
            for j in (i + 1)..size {
                combo[j] = combo[j - 1] + 1;
            }
        }
    }
    out
}

/// A non-empty set of unique detector indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetworkSubset(Vec<usize>);

impl NetworkSubset {
    /// Validate `indices` against a network of `num_detectors`.
    pub fn new(indices: Vec<usize>, num_detectors: usize) -> Result<Self, CbcError> {
        if indices.is_empty() {
            return Err(CbcError::MalformedNetworkSpec("empty detector subset".to_string()));
        }
        let mut seen = HashSet::new();
        for &i in &indices {
            if i >= num_detectors {
                return Err(CbcError::MalformedNetworkSpec(format!(
                    "detector index {i} out of range (network has {num_detectors} detectors)"
                )));
            }
            if !seen.insert(i) {
                return Err(CbcError::MalformedNetworkSpec(format!(
                    "detector index {i} repeated in {indices:?}"
                )));
            }
        }
        Ok(Self(indices))
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    /// Detector ids joined with `_`, e.g. `ET_CE2`.
    pub fn label(&self, ids: &[&str]) -> String {
        self.0
            .iter()
            .map(|&i| ids.get(i).copied().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Which detector subsets to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSpec {
    Explicit(Vec<Vec<usize>>),
    All,
}

impl FromStr for NetworkSpec {
    type Err = CbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(NetworkSpec::All);
        }
        serde_json::from_str::<Vec<Vec<usize>>>(s)
            .map(NetworkSpec::Explicit)
            .map_err(|e| CbcError::MalformedNetworkSpec(format!("'{s}': {e}")))
    }
}

impl NetworkSpec {
    /// Resolve into validated subsets for a network of `num_detectors`.
    pub fn resolve(&self, num_detectors: usize) -> Result<Vec<NetworkSubset>, CbcError> {
        let raw = match self {
            NetworkSpec::All => powerset(num_detectors),
            NetworkSpec::Explicit(lists) => lists.clone(),
        };
        if raw.is_empty() {
            return Err(CbcError::MalformedNetworkSpec("no detector subsets requested".to_string()));
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for indices in raw {
            let subset = NetworkSubset::new(indices, num_detectors)?;
            let mut key = subset.indices().to_vec();
            key.sort_unstable();
            if !seen.insert(key) {
                return Err(CbcError::MalformedNetworkSpec(format!(
                    "subset {:?} requested twice",
                    subset.indices()
                )));
            }
            out.push(subset);
        }
        Ok(out)
    }
}

/// Check that every subset indexes into a network of `num_detectors`.
pub fn check_subsets(subsets: &[NetworkSubset], num_detectors: usize) -> Result<(), CbcError> {
    for subset in subsets {
        if let Some(&i) = subset.indices().iter().find(|&&i| i >= num_detectors) {
            return Err(CbcError::MalformedNetworkSpec(format!(
                "subset {:?} uses detector index {i}, but the network has {num_detectors} detectors",
                subset.indices()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powerset_of_three_is_size_then_index_ordered() {
        let expected: Vec<Vec<usize>> = vec![
            vec![0],
            vec![1],
            vec![2],
            vec![0, 1],
            vec![0, 2],
            vec![1, 2],
            vec![0, 1, 2],
        ];
        assert_eq!(powerset(3), expected);
    }

    #[test]
    fn powerset_has_two_to_the_n_minus_one_unique_elements() {
        for n in 0..=8 {
            let sets = powerset(n);
            assert_eq!(sets.len(), (1usize << n) - 1, "n = {n}");
            let unique: HashSet<_> = sets.iter().cloned().collect();
            assert_eq!(unique.len(), sets.len());
            assert!(sets.iter().all(|s| !s.is_empty()));
        }
    }

    #[test]
    fn explicit_spec_parses_json() {
        let spec: NetworkSpec = "[[0,1],[0],[1]]".parse().unwrap();
        let subsets = spec.resolve(2).unwrap();
        assert_eq!(subsets.len(), 3);
        assert_eq!(subsets[0].indices(), &[0, 1]);
        assert_eq!(subsets[0].label(&["ET", "CE2"]), "ET_CE2");
    }

    #[test]
    fn all_expands_to_the_powerset() {
        let spec: NetworkSpec = "ALL".parse().unwrap();
        assert_eq!(spec, NetworkSpec::All);
        assert_eq!(spec.resolve(3).unwrap().len(), 7);
    }

    #[test]
    fn malformed_specs_are_rejected() {
        for bad in ["[[0,", "[0,1]", "everything"] {
            assert!(matches!(
                bad.parse::<NetworkSpec>(),
                Err(CbcError::MalformedNetworkSpec(_))
            ));
        }
        for bad in ["[[]]", "[[2]]", "[[0,0]]", "[]", "[[0,1],[1,0]]"] {
            let spec: NetworkSpec = bad.parse().unwrap();
            assert!(spec.resolve(2).is_err(), "{bad} should not resolve");
        }
    }
}
