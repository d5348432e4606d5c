use std::collections::HashMap;

use crate::endpoint::{EndpointDefinition, Verb};
use crate::matcher;

/// What a matched request is answered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    pub status: u16,
    pub body: String,
}

/// A single compiled (pattern, response) entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pattern: String,
    pub response: ResponseSpec,
}

/// Outcome of resolving an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Matched(ResponseSpec),
    NoMatch,
}

/// Immutable verb → routes mapping built from one store snapshot.
///
/// Never mutated after [`compile`] returns, so it can be shared across
/// request tasks without locking.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Verb, Vec<Route>>,
    skipped_duplicates: usize,
}

/// Build a route table from a full snapshot of definitions.
///
/// Routes keep the snapshot's order within each verb. A (verb, pattern) pair
/// seen more than once keeps its first definition; later ones are dropped
/// and logged.
pub fn compile(definitions: &[EndpointDefinition]) -> RouteTable {
    let mut routes: HashMap<Verb, Vec<Route>> = HashMap::new();
    let mut owners: HashMap<(Verb, &str), &str> = HashMap::new();
    let mut skipped_duplicates = 0;

    for definition in definitions {
        let key = (definition.verb, definition.pattern.as_str());
        if let Some(winner) = owners.get(&key) {
            tracing::warn!(
                verb = %definition.verb,
                pattern = %definition.pattern,
                kept_id = %winner,
                skipped_id = %definition.id,
                "Duplicate route in snapshot, keeping the first definition"
            );
            skipped_duplicates += 1;
            continue;
        }
        owners.insert(key, definition.id.as_str());

        routes.entry(definition.verb).or_default().push(Route {
            pattern: definition.pattern.clone(),
            response: ResponseSpec {
                status: definition.status,
                body: definition.response.clone(),
            },
        });
    }

    let table = RouteTable {
        routes,
        skipped_duplicates,
    };
    tracing::debug!(
        "Compiled route table with {} routes ({} duplicates skipped)",
        table.len(),
        skipped_duplicates
    );
    table
}

impl RouteTable {
    /// Resolve a request; `verb` is `None` for methods outside the verb set
    pub fn dispatch(&self, verb: Option<Verb>, path: &str) -> Dispatch {
        let Some(verb) = verb else {
            return Dispatch::NoMatch;
        };

        self.routes
            .get(&verb)
            .and_then(|routes| routes.iter().find(|route| matcher::matches(&route.pattern, path)))
            .map(|route| Dispatch::Matched(route.response.clone()))
            .unwrap_or(Dispatch::NoMatch)
    }

    #[cfg(test)]
    pub fn routes(&self, verb: Verb) -> &[Route] {
        self.routes.get(&verb).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }
}
