use crate::error::RankError;
use crate::index::{PageTable, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RankTable = BTreeMap<Url, f64>;

/// What to do with pages that link nowhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Dangling pages contribute nothing to their (nonexistent) link targets.
    #[default]
    Ignore,
    /// Spread each dangling page's rank evenly over every page.
    Redistribute,
    /// Fail with `RankError::DanglingNode`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    pub damping: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
    pub dangling: DanglingPolicy,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self { damping: 0.85, epsilon: 1e-6, max_iterations: 1000, dangling: DanglingPolicy::Ignore }
    }
}

/// Compute PageRank over a finished link graph. Every page is recomputed from the
/// previous iteration's ranks; iteration stops once no rank moves by more than
/// `epsilon`, and the result is normalized to sum to 1.
pub fn rank(pages: &PageTable, config: &RankConfig) -> Result<RankTable, RankError> {
    if pages.is_empty() {
        return Ok(RankTable::new());
    }
    if config.dangling == DanglingPolicy::Reject {
        if let Some((url, _)) = pages.iter().find(|(_, p)| p.out_degree() == 0) {
            return Err(RankError::DanglingNode { url: url.clone() });
        }
    }

    let n = pages.len() as f64;
    let d = config.damping;
    let mut ranks: RankTable = pages.keys().map(|url| (url.clone(), 1.0 / n)).collect();

    for iteration in 1..=config.max_iterations {
        let dangling_share = match config.dangling {
            DanglingPolicy::Redistribute => {
                pages
                    .iter()
                    .filter(|(_, p)| p.out_degree() == 0)
                    .map(|(url, _)| ranks[url])
                    .sum::<f64>()
                    / n
            }
            _ => 0.0,
        };

        let next: RankTable = pages
            .iter()
            .map(|(url, page)| {
                let inbound: f64 = page
                    .incoming
                    .iter()
                    .filter_map(|src| {
                        let out = pages.get(src)?.out_degree();
                        if out == 0 { return None; }
                        Some(ranks.get(src)? / out as f64)
                    })
                    .sum();
                (url.clone(), (1.0 - d) + d * (inbound + dangling_share))
            })
            .collect();

        let converged = next.iter().all(|(url, r)| (r - ranks[url]).abs() <= config.epsilon);
        ranks = next;
        if converged {
            tracing::info!(iterations = iteration, pages = pages.len(), "page ranks converged");
            normalize(&mut ranks);
            return Ok(ranks);
        }
    }

    Err(RankError::NonConvergence { iterations: config.max_iterations })
}

fn normalize(ranks: &mut RankTable) {
    let total: f64 = ranks.values().sum();
    if total > 0.0 {
        for r in ranks.values_mut() {
            *r /= total;
        }
    }
}
