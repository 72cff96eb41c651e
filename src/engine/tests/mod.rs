use super::*;
use crate::error::{ClusterError, StoreError};
use crate::tests::fakes::{Call, FakeCluster, FakeStore};
use crate::types::{AclSpec, OutcomeKind};
use yare::parameterized;


const ID_PREFIX: &str = "/consul/acl/ids/";
const RULES: &str = r#"key "" { policy = "read" }"#;

fn reconciler<'a>(cluster: &'a FakeCluster, store: &'a FakeStore) -> Reconciler<'a, FakeCluster, FakeStore> {
    Reconciler::new(cluster, store, ID_PREFIX, PutOptions::from_flags(false, None, false))
}

fn svc_a() -> DeclaredEntry {
    DeclaredEntry::new("svc-a", "svc-a").with_rules(RULES)
}

fn spec(id: Option<&str>, name: &str, kind: &str, rules: &str) -> AclSpec {
    AclSpec {
        id: id.map(str::to_string),
        name: name.to_string(),
        kind: kind.to_string(),
        rules: rules.to_string(),
    }
}

include!("branches.rs");
