//! The Service Resolver (C5, spec.md §4.5): fuzzy-matches a customer's
//! free-text service request against the active catalog. Never guesses
//! silently — a query with no match is a `NotFound`, a query that could mean
//! several things is an `Ambiguous`, listing up to 5 options.

use salon_core::domain::{Service, ServiceCategory};
use serde::Serialize;
use tracing::warn;

/// Below this normalized similarity a candidate is not considered a match
/// at all.
const MATCH_THRESHOLD: f64 = 0.55;
/// Above this the best candidate is considered decisive enough to resolve
/// without asking the customer to disambiguate.
const DECISIVE_THRESHOLD: f64 = 0.82;
const MAX_AMBIGUITY_OPTIONS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ServiceOption {
    pub id: String,
    pub name: String,
    pub duration_minutes: i32,
    pub category: ServiceCategory,
}

impl From<&Service> for ServiceOption {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id.as_str().to_string(),
            name: s.name.clone(),
            duration_minutes: s.duration_minutes,
            category: s.category,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Found(ServiceOption),
    Ambiguous {
        query: String,
        options: Vec<ServiceOption>,
    },
    NotFound {
        query: String,
    },
}

fn score(query: &str, name: &str) -> f64 {
    strsim::jaro_winkler(&query.to_lowercase(), &name.to_lowercase())
}

/// Candidates sorted by descending similarity, already filtered to those
/// clearing `MATCH_THRESHOLD`.
fn ranked_candidates<'a>(query: &str, services: &'a [Service]) -> Vec<(&'a Service, f64)> {
    let mut candidates: Vec<(&Service, f64)> = services
        .iter()
        .map(|s| (s, score(query, &s.name)))
        .filter(|(_, score)| *score >= MATCH_THRESHOLD)
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

/// Resolve a single free-text query against the active catalog.
pub fn resolve(query: &str, services: &[Service]) -> Resolution {
    let trimmed = query.trim();

    if let Some(exact) = services
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(trimmed))
    {
        return Resolution::Found(ServiceOption::from(exact));
    }

    let candidates = ranked_candidates(trimmed, services);
    match candidates.as_slice() {
        [] => Resolution::NotFound {
            query: trimmed.to_string(),
        },
        [(only, _)] => Resolution::Found(ServiceOption::from(*only)),
        [(best, best_score), (_, next_score), ..] if best_score - next_score >= 0.15 && *best_score >= DECISIVE_THRESHOLD => {
            Resolution::Found(ServiceOption::from(*best))
        }
        many => Resolution::Ambiguous {
            query: trimmed.to_string(),
            options: many
                .iter()
                .take(MAX_AMBIGUITY_OPTIONS)
                .map(|(s, _)| ServiceOption::from(*s))
                .collect(),
        },
    }
}

/// Top-*N* fuzzy matches for `search_services`, regardless of ambiguity —
/// the catalog browse path doesn't need a single resolved answer.
pub fn search(query: &str, services: &[Service], max_results: usize) -> Vec<ServiceOption> {
    ranked_candidates(query, services)
        .into_iter()
        .take(max_results)
        .map(|(s, _)| ServiceOption::from(s))
        .collect()
}

/// Duration-computation path (§4.5): on ambiguity, conservatively pick the
/// first option and log a warning rather than blocking the whole booking on
/// a disambiguation round-trip. Returns `None` only on a genuine zero-match
/// query.
pub fn resolve_for_duration(query: &str, services: &[Service]) -> Option<ServiceOption> {
    match resolve(query, services) {
        Resolution::Found(option) => Some(option),
        Resolution::Ambiguous { query, options } => {
            warn!(query, candidates = options.len(), "ambiguous service name in duration computation; picking first match");
            options.into_iter().next()
        }
        Resolution::NotFound { query } => {
            warn!(query, "no matching service found in duration computation");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::types::ServiceId;

    fn svc(name: &str) -> Service {
        Service {
            id: ServiceId::from(name),
            name: name.to_string(),
            duration_minutes: 30,
            category: ServiceCategory::Hairdressing,
            active: true,
        }
    }

    #[test]
    fn exact_match_short_circuits_fuzzy() {
        let services = vec![svc("Corte"), svc("Corte y peinado")];
        match resolve("corte", &services) {
            Resolution::Found(o) => assert_eq!(o.name, "Corte"),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn zero_matches_is_not_found() {
        let services = vec![svc("Corte"), svc("Manicura")];
        match resolve("xyz completely unrelated", &services) {
            Resolution::NotFound { .. } => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn similar_names_are_ambiguous() {
        let services = vec![svc("Corte de pelo"), svc("Corte de barba")];
        match resolve("corte de", &services) {
            Resolution::Ambiguous { options, .. } => assert_eq!(options.len(), 2),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn ambiguity_capped_at_five_options() {
        let services: Vec<Service> = (0..10).map(|i| svc(&format!("Tratamiento capilar {i}"))).collect();
        match resolve("tratamiento capilar", &services) {
            Resolution::Ambiguous { options, .. } => assert!(options.len() <= 5),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn duration_path_never_blocks_on_ambiguity() {
        let services = vec![svc("Corte de pelo"), svc("Corte de barba")];
        assert!(resolve_for_duration("corte de", &services).is_some());
    }
}
