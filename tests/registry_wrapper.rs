//! Registry wrapper contract tests.
//!
//! Drives the wrapper through an in-memory backend that reproduces the
//! platform's buffer-too-small, not-found, and access-denied behaviors,
//! so the retry and ownership logic is exercised without a live registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use isoscope::registry::backend::{
    Access, EnumStep, Hive, QueryStep, RawKey, RegBackend, STATUS_ACCESS_DENIED, STATUS_NOT_FOUND,
};
use isoscope::registry::value::ValueKind;
use isoscope::registry::{RegError, Registry};

const REG_BINARY: u32 = 3;

#[derive(Default)]
struct Node {
    children: Vec<(String, usize)>,
    values: Vec<(String, u32, Vec<u8>)>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    denied: HashSet<usize>,
    closes: Vec<RawKey>,
    /// Buffer capacity offered on each query_value call, for asserting the
    /// grow-and-retry discipline.
    query_sizes: Vec<usize>,
}

/// In-memory registry. Node 0..=3 are the hive roots; a raw handle is the
/// node index + 1.
struct MemBackend {
    state: Mutex<State>,
}

fn hive_node(hive: Hive) -> usize {
    match hive {
        Hive::CurrentUser => 0,
        Hive::LocalMachine => 1,
        Hive::ClassesRoot => 2,
        Hive::Users => 3,
    }
}

fn raw(node: usize) -> RawKey {
    node as RawKey + 1
}

fn node(raw: RawKey) -> usize {
    raw as usize - 1
}

impl MemBackend {
    fn new() -> Arc<Self> {
        let mut state = State::default();
        for _ in 0..4 {
            state.nodes.push(Node::default());
        }
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    fn closes(&self) -> Vec<RawKey> {
        self.state.lock().unwrap().closes.clone()
    }

    fn query_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().query_sizes.clone()
    }

    /// Mark the key at `path` below `hive` as access-denied on open.
    fn deny(&self, hive: Hive, path: &str) {
        let mut state = self.state.lock().unwrap();
        let node = resolve(&state, hive_node(hive), path).expect("deny target must exist");
        state.denied.insert(node);
    }

    /// Seed a value without going through the wrapper's typed setters.
    fn seed_value(&self, hive: Hive, path: &str, name: &str, kind: u32, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let node = create_path(&mut state, hive_node(hive), path);
        state.nodes[node]
            .values
            .push((name.to_string(), kind, data.to_vec()));
    }

    fn seed_key(&self, hive: Hive, path: &str) {
        let mut state = self.state.lock().unwrap();
        create_path(&mut state, hive_node(hive), path);
    }
}

fn resolve(state: &State, mut node: usize, path: &str) -> Option<usize> {
    for part in path.split('\\').filter(|p| !p.is_empty()) {
        node = state.nodes[node]
            .children
            .iter()
            .find(|(name, _)| name == part)
            .map(|(_, id)| *id)?;
    }
    Some(node)
}

fn create_path(state: &mut State, mut node: usize, path: &str) -> usize {
    for part in path.split('\\').filter(|p| !p.is_empty()) {
        let existing = state.nodes[node]
            .children
            .iter()
            .find(|(name, _)| name == part)
            .map(|(_, id)| *id);
        node = match existing {
            Some(id) => id,
            None => {
                let id = state.nodes.len();
                state.nodes.push(Node::default());
                state.nodes[node].children.push((part.to_string(), id));
                id
            }
        };
    }
    node
}

fn put_name(name: &str, buf: &mut [u16]) -> EnumStep {
    let wide: Vec<u16> = name.encode_utf16().collect();
    if wide.len() > buf.len() {
        return EnumStep::MoreData { needed: wide.len() };
    }
    buf[..wide.len()].copy_from_slice(&wide);
    EnumStep::Entry { len: wide.len() }
}

impl RegBackend for MemBackend {
    fn root(&self, hive: Hive) -> RawKey {
        raw(hive_node(hive))
    }

    fn open(&self, parent: RawKey, subkey: &str, _access: Access) -> Result<RawKey, u32> {
        let state = self.state.lock().unwrap();
        match resolve(&state, node(parent), subkey) {
            Some(id) if state.denied.contains(&id) => Err(STATUS_ACCESS_DENIED),
            Some(id) => Ok(raw(id)),
            None => Err(STATUS_NOT_FOUND),
        }
    }

    fn create(&self, parent: RawKey, subkey: &str, _access: Access) -> Result<RawKey, u32> {
        let mut state = self.state.lock().unwrap();
        let id = create_path(&mut state, node(parent), subkey);
        Ok(raw(id))
    }

    fn delete_tree(&self, parent: RawKey, subkey: &str) -> u32 {
        let mut state = self.state.lock().unwrap();
        let parent_node = node(parent);
        let (head, leaf) = match subkey.rsplit_once('\\') {
            Some((head, leaf)) => (head, leaf),
            None => ("", subkey),
        };
        let holder = match resolve(&state, parent_node, head) {
            Some(id) => id,
            None => return STATUS_NOT_FOUND,
        };
        let before = state.nodes[holder].children.len();
        state.nodes[holder].children.retain(|(name, _)| name != leaf);
        if state.nodes[holder].children.len() == before {
            STATUS_NOT_FOUND
        } else {
            0
        }
    }

    fn delete_value(&self, key: RawKey, name: &str) -> u32 {
        let mut state = self.state.lock().unwrap();
        let id = node(key);
        let before = state.nodes[id].values.len();
        state.nodes[id].values.retain(|(n, _, _)| n != name);
        if state.nodes[id].values.len() == before {
            STATUS_NOT_FOUND
        } else {
            0
        }
    }

    fn enum_key(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep {
        let state = self.state.lock().unwrap();
        match state.nodes[node(key)].children.get(index as usize) {
            Some((name, _)) => put_name(name, buf),
            None => EnumStep::Done,
        }
    }

    fn enum_value(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep {
        let state = self.state.lock().unwrap();
        match state.nodes[node(key)].values.get(index as usize) {
            Some((name, _, _)) => put_name(name, buf),
            None => EnumStep::Done,
        }
    }

    fn query_value(&self, key: RawKey, name: &str, buf: &mut [u8]) -> QueryStep {
        let mut state = self.state.lock().unwrap();
        state.query_sizes.push(buf.len());
        let id = node(key);
        match state.nodes[id].values.iter().find(|(n, _, _)| n == name) {
            Some((_, kind, data)) => {
                if data.len() > buf.len() {
                    QueryStep::MoreData { needed: data.len() }
                } else {
                    buf[..data.len()].copy_from_slice(data);
                    QueryStep::Value {
                        kind: *kind,
                        len: data.len(),
                    }
                }
            }
            None => QueryStep::NotFound,
        }
    }

    fn set_value(&self, key: RawKey, name: &str, kind: u32, data: &[u8]) -> u32 {
        let mut state = self.state.lock().unwrap();
        let id = node(key);
        state.nodes[id].values.retain(|(n, _, _)| n != name);
        state.nodes[id]
            .values
            .push((name.to_string(), kind, data.to_vec()));
        0
    }

    fn close(&self, key: RawKey) {
        self.state.lock().unwrap().closes.push(key);
    }
}

fn setup() -> (Arc<MemBackend>, Registry) {
    let backend = MemBackend::new();
    let registry = Registry::new(backend.clone());
    (backend, registry)
}

#[test]
fn open_missing_key_is_hard_failure() {
    let (_backend, registry) = setup();
    let err = registry
        .current_user()
        .open("Software\\Nothing", Access::Query)
        .unwrap_err();
    assert!(matches!(err, RegError::NotFound { .. }));
    assert!(err.to_string().contains("HKEY_CURRENT_USER\\Software\\Nothing"));
}

#[test]
fn open_if_exists_missing_key_yields_empty_handle() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .open_if_exists("Software\\Nothing", Access::Query)
        .unwrap();
    assert!(key.is_empty());
    assert_eq!(key.path(), "HKEY_CURRENT_USER\\Software\\Nothing");
}

#[test]
fn open_denied_key_is_hard_failure_even_when_suppressing() {
    let (backend, registry) = setup();
    backend.seed_key(Hive::CurrentUser, "Software\\Locked");
    backend.deny(Hive::CurrentUser, "Software\\Locked");
    let err = registry
        .current_user()
        .open_if_exists("Software\\Locked", Access::Query)
        .unwrap_err();
    assert!(matches!(err, RegError::AccessDenied { .. }));
}

#[test]
fn reads_on_empty_handle_fail_explicitly() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .open_if_exists("Missing", Access::Query)
        .unwrap();
    assert!(matches!(
        key.string_value("Name"),
        Err(RegError::Empty { .. })
    ));
    assert!(matches!(key.key_names(), Err(RegError::Empty { .. })));
    // The suppressing shapes are an explicit "return nothing" contract.
    assert_eq!(key.string_value_opt("Name").unwrap(), None);
    assert_eq!(
        key.raw_value_if_exists("Name").unwrap(),
        (ValueKind::None, Vec::new())
    );
}

#[test]
fn navigating_below_empty_handle_with_suppression_stays_empty() {
    let (_backend, registry) = setup();
    let parent = registry
        .current_user()
        .open_if_exists("Missing", Access::Query)
        .unwrap();
    let child = parent.open_if_exists("Deeper", Access::Query).unwrap();
    assert!(child.is_empty());
    assert_eq!(child.path(), "HKEY_CURRENT_USER\\Missing\\Deeper");
    assert!(matches!(
        parent.open("Deeper", Access::Query),
        Err(RegError::Empty { .. })
    ));
}

#[test]
fn string_round_trip() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Scope", Access::Full)
        .unwrap();
    key.set_string("Name", "hello").unwrap();
    assert_eq!(key.string_value("Name").unwrap(), "hello");
    assert_eq!(key.string_value_opt("Name").unwrap().as_deref(), Some("hello"));
}

#[test]
fn u32_and_u64_round_trip() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Scope", Access::Full)
        .unwrap();
    key.set_u32("N", 42).unwrap();
    key.set_u64("Q", u64::MAX - 7).unwrap();
    assert_eq!(key.u32_value("N").unwrap(), 42);
    assert_eq!(key.u64_value("Q").unwrap(), u64::MAX - 7);
    assert_eq!(key.u32_value_opt("Absent").unwrap(), None);
}

#[test]
fn missing_value_without_suppression_is_hard_failure() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Scope", Access::Full)
        .unwrap();
    assert!(matches!(
        key.u32_value("Absent"),
        Err(RegError::NotFound { .. })
    ));
}

#[test]
fn type_mismatch_is_hard_even_when_suppressing_absence() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Scope", Access::Full)
        .unwrap();
    key.set_string("Name", "hello").unwrap();
    let err = key.u32_value_opt("Name").unwrap_err();
    match err {
        RegError::TypeMismatch { expected, found, .. } => {
            assert_eq!(expected, "REG_DWORD");
            assert_eq!(found, "REG_SZ");
        }
        other => panic!("expected type mismatch, got {other}"),
    }
}

#[test]
fn value_read_grows_buffer_once_and_preserves_payload() {
    let (backend, registry) = setup();
    let payload: Vec<u8> = (0u8..64).collect();
    backend.seed_value(Hive::CurrentUser, "Software\\Blob", "Data", REG_BINARY, &payload);
    let key = registry
        .current_user()
        .open("Software\\Blob", Access::Query)
        .unwrap();
    let (kind, data) = key.raw_value("Data").unwrap();
    assert_eq!(kind, ValueKind::Binary);
    assert_eq!(data, payload);
    // First offer is the small initial buffer, the retry fits exactly.
    let sizes = backend.query_sizes();
    assert_eq!(sizes.len(), 2);
    assert!(sizes[0] < payload.len());
    assert_eq!(sizes[1], payload.len());
}

#[test]
fn guid_value_validates_size() {
    let (backend, registry) = setup();
    let guid = uuid::Uuid::from_u128(0xfeed_face_cafe_beef_feed_face_cafe_beef);
    backend.seed_value(
        Hive::CurrentUser,
        "Software\\Ids",
        "Good",
        REG_BINARY,
        &guid.to_bytes_le(),
    );
    backend.seed_value(Hive::CurrentUser, "Software\\Ids", "Short", REG_BINARY, &[0u8; 15]);
    let key = registry
        .current_user()
        .open("Software\\Ids", Access::Query)
        .unwrap();
    assert_eq!(key.guid_value("Good").unwrap(), guid);
    assert!(matches!(key.guid_value("Short"), Err(RegError::Decode { .. })));
}

#[test]
fn undersized_integer_payload_is_decode_failure() {
    let (backend, registry) = setup();
    // REG_DWORD tag with a 3-byte payload: corrupt, never zero-padded.
    backend.seed_value(Hive::CurrentUser, "Software\\Bad", "N", 4, &[1, 2, 3]);
    let key = registry
        .current_user()
        .open("Software\\Bad", Access::Query)
        .unwrap();
    assert!(matches!(key.u32_value("N"), Err(RegError::Decode { .. })));
}

#[test]
fn enumeration_returns_every_entry_exactly_once_across_regrowth() {
    let (_backend, registry) = setup();
    let parent = registry
        .current_user()
        .create("Software\\Many", Access::Full)
        .unwrap();
    // 40 children; name lengths climb past the initial 32-unit buffer so
    // regrowth happens mid-enumeration.
    let mut expected = Vec::new();
    for i in 0..40 {
        let name = format!("entry-{i:02}-{}", "x".repeat(i));
        parent.create(&name, Access::Full).unwrap();
        expected.push(name);
    }
    let names = parent.key_names().unwrap();
    assert_eq!(names, expected);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 40);
}

#[test]
fn value_name_enumeration_matches_insertion_order() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Vals", Access::Full)
        .unwrap();
    let mut expected = Vec::new();
    for i in 0..40 {
        let name = format!("value-{i:02}-{}", "y".repeat(i));
        key.set_u32(&name, i as u32).unwrap();
        expected.push(name);
    }
    assert_eq!(key.value_names().unwrap(), expected);
}

#[test]
fn delete_tree_contract() {
    let (_backend, registry) = setup();
    let root = registry.current_user();
    root.create("Software\\Doomed\\Child", Access::Full).unwrap();
    assert!(matches!(
        root.delete_tree("Software\\Absent"),
        Err(RegError::NotFound { .. })
    ));
    assert!(root.delete_tree_if_exists("Software\\Doomed").unwrap());
    assert!(!root.delete_tree_if_exists("Software\\Doomed").unwrap());
}

#[test]
fn delete_value_requires_presence() {
    let (_backend, registry) = setup();
    let key = registry
        .current_user()
        .create("Software\\Scope", Access::Full)
        .unwrap();
    key.set_u32("N", 1).unwrap();
    key.delete_value("N").unwrap();
    assert!(matches!(
        key.delete_value("N"),
        Err(RegError::NotFound { .. })
    ));
}

#[test]
fn root_accessors_are_idempotent_and_never_closed() {
    let (backend, registry) = setup();
    {
        for hive in Hive::ALL {
            let a = registry.root(hive);
            let b = registry.root(hive);
            assert_eq!(a.path(), hive.display_name());
            assert_eq!(a.path(), b.path());
            assert!(a.shares_resource_with(&b));
        }
    }
    assert!(backend.closes().is_empty());
}

#[test]
fn handle_closes_exactly_once_when_last_clone_drops() {
    let (backend, registry) = setup();
    backend.seed_key(Hive::CurrentUser, "Software\\Shared");
    {
        let key = registry
            .current_user()
            .open("Software\\Shared", Access::Query)
            .unwrap();
        let clone = key.clone();
        assert!(key.shares_resource_with(&clone));
        drop(key);
        assert!(backend.closes().is_empty());
    }
    assert_eq!(backend.closes().len(), 1);
}

#[test]
fn path_builds_incrementally() {
    let (backend, registry) = setup();
    backend.seed_key(Hive::LocalMachine, "SOFTWARE\\Vendor\\App");
    let key = registry
        .local_machine()
        .open("SOFTWARE\\Vendor", Access::Query)
        .unwrap()
        .open("App", Access::Query)
        .unwrap();
    assert_eq!(key.path(), "HKEY_LOCAL_MACHINE\\SOFTWARE\\Vendor\\App");
}

mod moniker_resolution {
    use super::*;
    use isoscope::checks::network_isolation::{resolve_moniker, MONIKER_MAPPINGS_KEY};

    #[test]
    fn resolves_registered_moniker() {
        let (backend, registry) = setup();
        let sid = "S-1-15-2-1111-2222";
        let path = format!("{MONIKER_MAPPINGS_KEY}\\{sid}");
        backend.seed_value(
            Hive::CurrentUser,
            &path,
            "Moniker",
            1, // REG_SZ
            &isoscope::registry::value::encode_string("contoso.app"),
        );
        assert_eq!(
            resolve_moniker(&registry, sid).unwrap().as_deref(),
            Some("contoso.app")
        );
    }

    #[test]
    fn missing_entry_or_table_is_not_an_error() {
        let (backend, registry) = setup();
        assert_eq!(resolve_moniker(&registry, "S-1-15-2-9").unwrap(), None);
        backend.seed_key(Hive::CurrentUser, MONIKER_MAPPINGS_KEY);
        assert_eq!(resolve_moniker(&registry, "S-1-15-2-9").unwrap(), None);
    }

    #[test]
    fn corrupt_moniker_type_is_hard_failure() {
        let (backend, registry) = setup();
        let sid = "S-1-15-2-3";
        let path = format!("{MONIKER_MAPPINGS_KEY}\\{sid}");
        backend.seed_value(Hive::CurrentUser, &path, "Moniker", 4, &7u32.to_le_bytes());
        assert!(matches!(
            resolve_moniker(&registry, sid),
            Err(RegError::TypeMismatch { .. })
        ));
    }
}
