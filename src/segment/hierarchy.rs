//! Agglomerative hierarchical clustering.
//!
//! Builds the full merge tree bottom-up: every synth starts as its own
//! cluster and the closest pair (under the chosen linkage) merges until one
//! cluster remains. Each internal node records the merge distance and the
//! synth ids it covers, which is exactly what a dendrogram renderer needs.
//!
//! Inter-cluster distances are maintained with Lance-Williams updates, so
//! each merge costs O(m) and the whole tree O(n²) distance work on top of
//! the initial pairwise matrix.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{PopulationGroup, SimulationResult};
use crate::error::CoreError;
use crate::math::euclidean;

use super::{Feature, feature_matrix, silhouette};

/// Candidate k range scanned by the cut suggester.
const CUT_CANDIDATE_MAX: usize = 10;

/// Linkage criterion for inter-cluster distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Single,
    Average,
    Complete,
}

impl Linkage {
    pub fn display_name(self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Average => "average",
            Linkage::Complete => "complete",
        }
    }

    /// Lance-Williams combination of the distances from two merged
    /// clusters (sizes `ni`, `nj`) to a third cluster.
    fn combine(self, d_ik: f64, d_jk: f64, ni: usize, nj: usize) -> f64 {
        match self {
            Linkage::Single => d_ik.min(d_jk),
            Linkage::Complete => d_ik.max(d_jk),
            Linkage::Average => {
                (ni as f64 * d_ik + nj as f64 * d_jk) / (ni + nj) as f64
            }
        }
    }
}

/// One merge in the tree. Leaves are implicit (ids `0..n`); internal nodes
/// get ids `n..2n-1` in merge order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeNode {
    pub id: usize,
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Synth ids covered by this subtree.
    pub members: Vec<u32>,
}

/// Silhouette of one candidate cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutCandidate {
    pub k: usize,
    pub silhouette: f64,
}

/// Full hierarchical clustering output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dendrogram {
    pub linkage: Linkage,
    pub synth_ids: Vec<u32>,
    pub merges: Vec<MergeNode>,
    /// Candidate cuts ordered by descending silhouette.
    pub cuts: Vec<CutCandidate>,
    pub suggested_k: usize,
}

impl Dendrogram {
    /// Partition the leaves into `k` clusters by undoing the last `k - 1`
    /// merges. Returns a cluster index per leaf (row order).
    pub fn cut(&self, k: usize) -> Result<Vec<usize>, CoreError> {
        let n = self.synth_ids.len();
        if k == 0 || k > n {
            return Err(CoreError::config(format!(
                "cannot cut a dendrogram over {n} synths into {k} clusters"
            )));
        }

        // Replay merges until only k sets remain.
        let mut set_of: Vec<usize> = (0..n).collect();
        let mut sets = n;
        // node id -> representative set. Leaves represent themselves; an
        // internal node's entry is written when its merge is applied, which
        // is always before any later merge reads it.
        let mut rep: Vec<usize> = (0..2 * n - 1).collect();

        for merge in &self.merges {
            if sets == k {
                break;
            }
            let keep = rep[merge.left];
            let absorb = rep[merge.right];
            for s in set_of.iter_mut() {
                if *s == absorb {
                    *s = keep;
                }
            }
            rep[merge.id] = keep;
            sets -= 1;
        }

        // Relabel to dense 0..k indices, ordered by first appearance.
        let mut labels: Vec<usize> = Vec::new();
        let assignments = set_of
            .iter()
            .map(|s| {
                if let Some(pos) = labels.iter().position(|l| l == s) {
                    pos
                } else {
                    labels.push(*s);
                    labels.len() - 1
                }
            })
            .collect();
        Ok(assignments)
    }
}

/// Build the dendrogram for one simulated group and suggest cut points.
pub fn hierarchical(
    group: &PopulationGroup,
    result: &SimulationResult,
    features: &[Feature],
    linkage: Linkage,
) -> Result<Dendrogram, CoreError> {
    let matrix = feature_matrix(group, result, features)?;
    let n = matrix.len();
    if n < 2 {
        return Err(CoreError::InsufficientData {
            required: 2,
            actual: n,
        });
    }

    let merges = build_merges(&matrix.rows, &matrix.synth_ids, linkage);

    let mut dendrogram = Dendrogram {
        linkage,
        synth_ids: matrix.synth_ids.clone(),
        merges,
        cuts: Vec::new(),
        suggested_k: 2,
    };

    // Score candidate cuts and order them best-first.
    let mut cuts = Vec::new();
    for k in 2..=CUT_CANDIDATE_MAX.min(n - 1) {
        let assignments = dendrogram.cut(k)?;
        cuts.push(CutCandidate {
            k,
            silhouette: silhouette(&matrix.rows, &assignments, k),
        });
    }
    cuts.sort_by(|a, b| {
        b.silhouette
            .partial_cmp(&a.silhouette)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    dendrogram.suggested_k = cuts.first().map(|c| c.k).unwrap_or(2);
    dendrogram.cuts = cuts;

    Ok(dendrogram)
}

struct ActiveCluster {
    node_id: usize,
    members: Vec<u32>,
    size: usize,
}

fn build_merges(rows: &[Vec<f64>], synth_ids: &[u32], linkage: Linkage) -> Vec<MergeNode> {
    let n = rows.len();

    let mut clusters: Vec<ActiveCluster> = (0..n)
        .map(|i| ActiveCluster {
            node_id: i,
            members: vec![synth_ids[i]],
            size: 1,
        })
        .collect();

    // Symmetric distance matrix over the active clusters.
    let mut dist: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| euclidean(&rows[i], &rows[j])).collect())
        .collect();

    let mut merges = Vec::with_capacity(n - 1);
    let mut next_id = n;

    while clusters.len() > 1 {
        // Closest active pair; ties break toward the lowest index pair so
        // the tree is deterministic.
        let (mut bi, mut bj, mut bd) = (0usize, 1usize, f64::INFINITY);
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                if dist[i][j] < bd {
                    bd = dist[i][j];
                    bi = i;
                    bj = j;
                }
            }
        }

        // Lance-Williams: distance from the merged cluster to every other.
        let mut merged_dist: Vec<f64> = (0..clusters.len())
            .map(|k| {
                linkage.combine(dist[bi][k], dist[bj][k], clusters[bi].size, clusters[bj].size)
            })
            .collect();

        // Drop index bj everywhere with the same swap_remove, so merged
        // distances stay aligned with the surviving cluster indices
        // (bi < bj, so bi is never the element that gets swapped in).
        merged_dist.swap_remove(bj);
        for row in dist.iter_mut() {
            row.swap_remove(bj);
        }
        dist.swap_remove(bj);
        let right = clusters.swap_remove(bj);

        let mut members = std::mem::take(&mut clusters[bi].members);
        members.extend(&right.members);
        members.sort_unstable();

        merges.push(MergeNode {
            id: next_id,
            left: clusters[bi].node_id,
            right: right.node_id,
            distance: bd,
            members: members.clone(),
        });

        let size = clusters[bi].size + right.size;
        clusters[bi] = ActiveCluster {
            node_id: next_id,
            members,
            size,
        };
        next_id += 1;

        for k in 0..clusters.len() {
            let d = if k == bi { 0.0 } else { merged_dist[k] };
            dist[bi][k] = d;
            dist[k][bi] = d;
        }
    }

    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::sim::simulate;

    fn simulated(n: usize) -> (crate::domain::PopulationGroup, SimulationResult) {
        let group = generate(&DistributionConfig::default(), "g", n, 31).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            50,
            32,
        )
        .unwrap();
        (group, result)
    }

    #[test]
    fn tree_has_n_minus_one_merges_and_full_root() {
        let (group, result) = simulated(40);
        let tree = hierarchical(&group, &result, &Feature::default_set(), Linkage::Average)
            .unwrap();
        assert_eq!(tree.merges.len(), 39);
        let root = tree.merges.last().unwrap();
        assert_eq!(root.members.len(), 40);
    }

    #[test]
    fn merge_distances_are_nondecreasing_under_complete_linkage() {
        let (group, result) = simulated(30);
        let tree = hierarchical(&group, &result, &Feature::default_set(), Linkage::Complete)
            .unwrap();
        for w in tree.merges.windows(2) {
            // Complete linkage is reducible, so the merge sequence is
            // monotone in distance.
            assert!(w[1].distance >= w[0].distance - 1e-9);
        }
    }

    #[test]
    fn cut_produces_exactly_k_clusters() {
        let (group, result) = simulated(25);
        let tree = hierarchical(&group, &result, &Feature::default_set(), Linkage::Average)
            .unwrap();
        for k in [2, 3, 5] {
            let assignments = tree.cut(k).unwrap();
            let mut labels = assignments.clone();
            labels.sort_unstable();
            labels.dedup();
            assert_eq!(labels.len(), k, "cut at k={k}");
        }
        assert!(tree.cut(0).is_err());
        assert!(tree.cut(26).is_err());
    }

    #[test]
    fn suggested_cut_is_the_best_scoring_candidate() {
        let (group, result) = simulated(35);
        let tree = hierarchical(&group, &result, &Feature::default_set(), Linkage::Average)
            .unwrap();
        assert_eq!(tree.suggested_k, tree.cuts[0].k);
        for w in tree.cuts.windows(2) {
            assert!(w[0].silhouette >= w[1].silhouette);
        }
    }

    #[test]
    fn single_synth_population_is_insufficient() {
        let (group, result) = simulated(1);
        let err = hierarchical(&group, &result, &Feature::default_set(), Linkage::Single)
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
