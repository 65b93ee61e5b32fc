// tests/property/registry_consistency_test.rs

//! Property-based tests for registry consistency
//! Arbitrary register/unregister sequences must leave the registry matching a plain map.

use chathub::core::ConnectionRegistry;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
enum Op {
    Register(u8, String),
    RegisterAnonymous(u8),
    Unregister(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..16, "(alice|bob|carol|)").prop_map(|(id, name)| Op::Register(id, name)),
        1 => (0u8..16).prop_map(Op::RegisterAnonymous),
        1 => (0u8..16).prop_map(Op::Unregister),
    ]
}

fn conn(id: u8) -> String {
    format!("conn-{id}")
}

/// Applies `op` to both the registry and the model map.
fn apply(registry: &ConnectionRegistry, model: &mut HashMap<String, Option<String>>, op: &Op) -> bool {
    match op {
        Op::Register(id, name) => {
            registry.register(conn(*id), name.clone());
            model.insert(conn(*id), Some(name.clone()));
            true
        }
        Op::RegisterAnonymous(id) => {
            registry.register_anonymous(conn(*id));
            model.insert(conn(*id), None);
            true
        }
        Op::Unregister(id) => registry.unregister(&conn(*id)) == model.remove(&conn(*id)).is_some(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..=100)) {
        let registry = ConnectionRegistry::new();
        let mut model: HashMap<String, Option<String>> = HashMap::new();

        for op in &ops {
            prop_assert!(apply(&registry, &mut model, op), "unregister disagreed on {:?}", op);
        }

        prop_assert_eq!(registry.len(), model.len());
        for (id, name) in &model {
            prop_assert!(registry.contains(id));
            prop_assert_eq!(registry.username_of(id), name.clone());
        }
    }

    #[test]
    fn test_lookup_returns_exactly_matching_connections(
        ops in prop::collection::vec(op_strategy(), 1..=100),
        queried in "(alice|bob|carol|dave|)"
    ) {
        let registry = ConnectionRegistry::new();
        let mut model: HashMap<String, Option<String>> = HashMap::new();
        for op in &ops {
            apply(&registry, &mut model, op);
        }

        let found: BTreeSet<String> = registry
            .lookup_connections_by_username(&queried)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        // Explicit names match exactly, the empty one included; anonymous entries never do.
        let expected: BTreeSet<String> = model
            .iter()
            .filter(|(_, name)| name.as_deref() == Some(queried.as_str()))
            .map(|(id, _)| id.clone())
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn test_lookup_is_case_sensitive(name in "[a-z]{1,12}") {
        let registry = ConnectionRegistry::new();
        registry.register("c1", name.clone());

        prop_assert_eq!(registry.lookup_connections_by_username(&name).len(), 1);
        prop_assert!(registry
            .lookup_connections_by_username(&name.to_uppercase())
            .is_empty());
    }
}
