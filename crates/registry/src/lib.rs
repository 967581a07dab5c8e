//! Server registry & importance (spec §4.4): per-host aggregate stats and
//! the host-level priority bonus they feed into the frontier.

use citysearch_core::config::RegistryConfig;
use citysearch_core::Server;

/// Apply a save-results call's outcome to a host's running totals.
/// Mutates in place; callers persist the updated row.
pub fn record_job_outcome(server: &mut Server, success: bool, relevant: bool) {
    server.total_done_jobs += 1;
    if success {
        server.success_jobs += 1;
    }
    if relevant {
        server.relevant_documents += 1;
    }
}

/// The piecewise-quadratic bonus/penalty spec §4.4 calls `ρ`: a bonus
/// growing with the square of the distance past `theta`, or a penalty
/// growing with the square of the distance short of it.
fn rho(x: f64, theta: f64, bonus: f64, cost: f64) -> f64 {
    if theta >= 1.0 {
        return 0.0;
    }
    if x >= theta {
        bonus * ((x - theta) / (1.0 - theta)).powi(2)
    } else {
        -cost * ((x - theta) / theta).powi(2)
    }
}

/// Host importance bonus added to every one of a host's jobs' priority:
/// a page-rank term capped at `importance_cap`, plus — once the host has
/// enough completed jobs to trust its ratios — a success/relevance bonus
/// or penalty; below the sample threshold, a flat penalty instead.
pub fn importance(server: &Server, cfg: &RegistryConfig) -> f64 {
    let page_rank_term = (cfg.importance_alpha * server.page_rank).min(cfg.importance_cap);

    let ratio_term = if server.total_done_jobs > cfg.importance_min_sample {
        rho(
            server.success_ratio(),
            cfg.importance_theta,
            cfg.importance_b_success,
            cfg.importance_c_success,
        ) + rho(
            server.relevant_ratio(),
            cfg.importance_theta,
            cfg.importance_b_relevant,
            cfg.importance_c_relevant,
        )
    } else {
        -cfg.importance_below_threshold_penalty
    };

    page_rank_term + ratio_term
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RegistryConfig {
        RegistryConfig {
            importance_alpha: 10.0,
            importance_cap: 5.0,
            importance_theta: 0.5,
            importance_b_success: 2.0,
            importance_c_success: 2.0,
            importance_b_relevant: 2.0,
            importance_c_relevant: 2.0,
            importance_min_sample: 10,
            importance_below_threshold_penalty: 1.0,
        }
    }

    fn server(total: i64, success: i64, relevant: i64, page_rank: f64) -> Server {
        Server {
            id: 1,
            name: "example.com".into(),
            is_blacklisted: false,
            page_rank,
            total_done_jobs: total,
            success_jobs: success,
            relevant_documents: relevant,
        }
    }

    #[test]
    fn below_sample_threshold_gets_flat_penalty() {
        let s = server(3, 3, 3, 0.0);
        assert_eq!(importance(&s, &cfg()), -1.0);
    }

    #[test]
    fn page_rank_term_is_capped() {
        let s = server(20, 20, 20, 1.0);
        let imp = importance(&s, &cfg());
        // alpha * page_rank = 10, capped at 5, plus positive ratio bonuses.
        assert!(imp >= 5.0);
    }

    #[test]
    fn consistently_failing_host_is_penalized() {
        let good = server(20, 20, 20, 0.0);
        let bad = server(20, 0, 0, 0.0);
        assert!(importance(&good, &cfg()) > importance(&bad, &cfg()));
    }

    #[test]
    fn monotone_in_page_rank_below_cap() {
        let low = server(20, 10, 10, 0.1);
        let high = server(20, 10, 10, 0.2);
        assert!(importance(&high, &cfg()) >= importance(&low, &cfg()));
    }
}
