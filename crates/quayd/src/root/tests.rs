//! Unit tests for the dispatch roots.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use quay_params::{ErrorCode, Tag};
use rstest::{fixture, rstest};
use serde::Serialize;
use serde_json::{Value, json};

use super::*;
use crate::abort::{AbortSignal, abort_pair};
use crate::authorizer::Authorizer;
use crate::context::FacadeContext;
use crate::entity::{Entity, MachineJob};
use crate::registry::{FacadeFactory, FacadeRegistry, FacadeType, MethodTable, RegistryError};
use crate::resources::StringResource;
use crate::session::Session;
use crate::state::MockStateBackend;

const COUNTER: &str = "Counter";

/// What a counter facade saw when it was constructed.
#[derive(Debug, Clone, Serialize)]
struct Snapshot {
    serial: usize,
    object_id: String,
    aborted: bool,
    owner: Option<String>,
    manager: bool,
    machine_id: Option<String>,
}

struct Counter {
    snapshot: Snapshot,
}

struct Stranger;

fn counter_methods() -> MethodTable {
    MethodTable::builder::<Counter>()
        .method("Serial", |counter: &Counter, (): ()| Ok(counter.snapshot.serial))
        .method("Snapshot", |counter: &Counter, (): ()| Ok(counter.snapshot.clone()))
        .method("Add", |counter: &Counter, amount: usize| {
            Ok(counter.snapshot.serial + amount)
        })
        .build()
        .expect("counter table")
}

fn build_counter(
    context: &dyn FacadeContext,
    constructions: &AtomicUsize,
    delay: Duration,
) -> Counter {
    thread::sleep(delay);
    let auth = context.auth();
    Counter {
        snapshot: Snapshot {
            serial: constructions.fetch_add(1, Ordering::SeqCst),
            object_id: context.id().to_owned(),
            aborted: context.abort().is_aborted(),
            owner: auth.get_auth_tag().map(ToString::to_string),
            manager: auth.auth_model_manager(),
            machine_id: context.resources().string_value("machineID"),
        },
    }
}

fn counting_registry(constructions: &Arc<AtomicUsize>, delay: Duration) -> Arc<FacadeRegistry> {
    let mut registry = FacadeRegistry::new();
    let counter = Arc::clone(constructions);
    registry
        .register(COUNTER, 1, counter_methods(), move |context| {
            Ok(build_counter(context, &counter, delay))
        })
        .expect("register counter v1");
    let counter = Arc::clone(constructions);
    registry
        .register(COUNTER, 2, counter_methods(), move |context| {
            Ok(build_counter(context, &counter, delay))
        })
        .expect("register counter v2");
    Arc::new(registry)
}

#[fixture]
fn session() -> Arc<Session> {
    Arc::new(Session::new(
        Arc::new(MockStateBackend::new()),
        "deadbeef",
        "localhost:17070",
    ))
}

#[fixture]
fn constructions() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn serial_of(root: &dyn MethodFinder, version: u32, object_id: &str) -> usize {
    let value = root
        .find_method(COUNTER, version, "Serial")
        .expect("Serial resolves")
        .call(object_id, Value::Null)
        .expect("Serial succeeds");
    serde_json::from_value(value).expect("serial is a number")
}

// ---------------------------------------------------------------------------
// ApiRoot
// ---------------------------------------------------------------------------

#[rstest]
#[case::unknown_facade("Missing", 1, "Serial", false)]
#[case::unknown_version(COUNTER, 9, "Serial", false)]
#[case::unknown_method(COUNTER, 1, "Reset", true)]
fn unknown_routes_are_not_implemented(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
    #[case] facade: &str,
    #[case] version: u32,
    #[case] method: &str,
    #[case] names_method: bool,
) {
    let root = ApiRoot::new(counting_registry(&constructions, Duration::ZERO), session);
    let error = root
        .find_method(facade, version, method)
        .expect_err("route must miss");

    assert!(error.is_not_implemented());
    assert_eq!(error.code(), ErrorCode::NotImplemented);
    assert_eq!(error.to_string().contains(method), names_method);
    match error {
        RpcError::CallNotImplemented(details) => {
            assert_eq!(details.root, facade);
            assert_eq!(details.version, version);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(constructions.load(Ordering::SeqCst), 0);
}

#[rstest]
fn resolving_a_method_does_not_construct(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
) {
    let root = ApiRoot::new(counting_registry(&constructions, Duration::ZERO), session);
    let caller = root.find_method(COUNTER, 1, "Add").expect("Add resolves");

    assert_eq!(caller.method_name(), "Add");
    assert_eq!(caller.params_shape().type_name(), "usize");
    assert_eq!(caller.result_shape().type_name(), "usize");
    assert_eq!(constructions.load(Ordering::SeqCst), 0);
    assert_eq!(root.cached_objects(), 0);

    assert_eq!(caller.call("", json!(5)).expect("Add"), json!(5));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[rstest]
fn concurrent_resolvers_share_one_instance(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
) {
    const CALLERS: usize = 64;
    let root = ApiRoot::new(
        counting_registry(&constructions, Duration::from_millis(20)),
        session,
    );
    let barrier = Barrier::new(CALLERS);

    let serials: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    serial_of(&root, 1, "")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("caller panicked"))
            .collect()
    });

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(serials.iter().all(|serial| *serial == 0), "{serials:?}");
    assert_eq!(root.cached_objects(), 1);
}

#[rstest]
fn instances_are_keyed_by_version_and_object_id(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
) {
    let root = ApiRoot::new(counting_registry(&constructions, Duration::ZERO), session);

    let first = serial_of(&root, 1, "");
    let other_version = serial_of(&root, 2, "");
    let other_id = serial_of(&root, 1, "secondary");

    assert_ne!(first, other_version);
    assert_ne!(first, other_id);
    assert_ne!(other_version, other_id);
    assert_eq!(serial_of(&root, 1, ""), first);
    assert_eq!(serial_of(&root, 2, ""), other_version);
    assert_eq!(constructions.load(Ordering::SeqCst), 3);
    assert_eq!(root.cached_objects(), 3);
}

#[rstest]
fn failed_construction_is_not_cached(session: Arc<Session>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut registry = FacadeRegistry::new();
    let counter = Arc::clone(&attempts);
    registry
        .register(COUNTER, 1, counter_methods(), move |context| {
            if counter.load(Ordering::SeqCst) == 0 {
                counter.fetch_add(1, Ordering::SeqCst);
                return Err(RpcError::facade(ErrorCode::NotFound, "model is gone"));
            }
            Ok(build_counter(context, &counter, Duration::ZERO))
        })
        .expect("register flaky counter");
    let root = ApiRoot::new(Arc::new(registry), session);
    let caller = root.find_method(COUNTER, 1, "Serial").expect("resolves");

    let error = caller.call("", Value::Null).expect_err("first build fails");
    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.to_string(), "model is gone");
    assert_eq!(root.cached_objects(), 0);

    assert_eq!(caller.call("", Value::Null).expect("retry builds"), json!(1));
    assert_eq!(root.cached_objects(), 1);
}

#[rstest]
fn undeclared_factory_output_is_an_inconsistency(session: Arc<Session>) {
    let mut registry = FacadeRegistry::new();
    let factory: FacadeFactory =
        Arc::new(|_: &dyn FacadeContext| Ok(Arc::new(Stranger) as FacadeObject));
    registry
        .register_erased(COUNTER, 1, FacadeType::new(counter_methods()), factory)
        .expect("register erased");
    let root = ApiRoot::new(Arc::new(registry), session);

    let error = root
        .find_method(COUNTER, 1, "Serial")
        .expect("resolves")
        .call("", Value::Null)
        .expect_err("type check must fail");

    assert!(matches!(error, RpcError::InternalInconsistency { .. }));
    assert_eq!(error.code(), ErrorCode::Internal);
    assert_eq!(root.cached_objects(), 0);
}

#[rstest]
fn factories_see_the_connection_context(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
) {
    session
        .authenticate(Entity::machine("0", [MachineJob::ManageModel]))
        .expect("login");
    session
        .register_resource("machineID", Arc::new(StringResource::new("0")))
        .expect("register machine id");
    let (handle, signal) = abort_pair();
    handle.abort();
    let root = ApiRoot::with_abort_signal(
        counting_registry(&constructions, Duration::ZERO),
        session,
        signal,
    );

    let snapshot = root
        .find_method(COUNTER, 1, "Snapshot")
        .expect("Snapshot resolves")
        .call("unit-7", Value::Null)
        .expect("Snapshot succeeds");

    assert_eq!(
        snapshot,
        json!({
            "serial": 0,
            "object_id": "unit-7",
            "aborted": true,
            "owner": Tag::machine("0").to_string(),
            "manager": true,
            "machine_id": "0",
        })
    );
}

#[rstest]
fn default_abort_signal_never_fires(session: Arc<Session>, constructions: Arc<AtomicUsize>) {
    let root = ApiRoot::new(counting_registry(&constructions, Duration::ZERO), session);
    let snapshot = root
        .find_method(COUNTER, 1, "Snapshot")
        .expect("Snapshot resolves")
        .call("", Value::Null)
        .expect("Snapshot succeeds");
    assert_eq!(snapshot["aborted"], json!(false));
    assert_eq!(snapshot["owner"], Value::Null);
}

#[rstest]
fn kill_stops_resources_and_drops_instances(
    session: Arc<Session>,
    constructions: Arc<AtomicUsize>,
) {
    session
        .register_resource("logDir", Arc::new(StringResource::new("/var/log/quay")))
        .expect("register");
    let root = ApiRoot::new(
        counting_registry(&constructions, Duration::ZERO),
        Arc::clone(&session),
    );
    serial_of(&root, 1, "");
    assert_eq!(root.cached_objects(), 1);

    let first = root.kill();
    let second = root.kill();

    assert_eq!(first.stopped, 1);
    assert_eq!(second.stopped, 0);
    assert_eq!(root.cached_objects(), 0);
    assert!(session.resources().is_closed());
}

// ---------------------------------------------------------------------------
// AnonRoot
// ---------------------------------------------------------------------------

struct Greeter {
    greeting: &'static str,
}

fn greeter_apis() -> AdminApis {
    let methods = || {
        MethodTable::builder::<Greeter>()
            .method("Hello", |greeter: &Greeter, name: String| {
                Ok(format!("{} {name}", greeter.greeting))
            })
            .build()
            .expect("greeter table")
    };
    let mut apis = AdminApis::new();
    apis.insert(
        3,
        AdminApi::new(Greeter { greeting: "hello" }, methods()).expect("admin v3"),
    );
    apis.insert(
        4,
        AdminApi::new(Greeter { greeting: "welcome" }, methods()).expect("admin v4"),
    );
    apis
}

#[fixture]
fn anon_root(session: Arc<Session>) -> AnonRoot {
    AnonRoot::new(session, greeter_apis())
}

#[rstest]
#[case::logger("Logger", 1)]
#[case::lowercase_admin("admin", 3)]
#[case::client("Client", 3)]
fn anonymous_root_only_serves_admin(
    anon_root: AnonRoot,
    #[case] facade: &str,
    #[case] version: u32,
) {
    let error = anon_root
        .find_method(facade, version, "Hello")
        .expect_err("non-admin facade must be refused");
    assert!(error.is_not_implemented());
    assert!(anon_root.session().get_auth_tag().is_none());
}

#[rstest]
#[case::too_old(2)]
#[case::too_new(5)]
fn unknown_admin_versions_are_unsupported(anon_root: AnonRoot, #[case] version: u32) {
    let error = anon_root
        .find_method(ADMIN_ROOT, version, "Hello")
        .expect_err("version must be refused");
    assert!(matches!(
        error,
        RpcError::UnsupportedClientVersion { version: refused } if refused == version
    ));
    assert_eq!(error.code(), ErrorCode::NotSupported);
}

#[rstest]
fn unknown_admin_methods_are_not_implemented(anon_root: AnonRoot) {
    let error = anon_root
        .find_method(ADMIN_ROOT, 3, "Goodbye")
        .expect_err("method must miss");
    assert!(error.is_not_implemented());
    assert!(error.to_string().contains("Admin(3).Goodbye"));
}

#[rstest]
#[case::v3(3, "hello bob")]
#[case::v4(4, "welcome bob")]
fn admin_versions_answer_with_their_own_implementation(
    anon_root: AnonRoot,
    #[case] version: u32,
    #[case] expected: &str,
) {
    let caller = anon_root
        .find_method(ADMIN_ROOT, version, "Hello")
        .expect("Hello resolves");
    assert_eq!(caller.call("", json!("bob")).expect("Hello"), json!(expected));
    assert_eq!(
        caller.call("ignored-id", json!("bob")).expect("Hello"),
        json!(expected)
    );
}

#[rstest]
fn anonymous_kill_stops_session_resources(session: Arc<Session>) {
    session
        .register_resource("dataDir", Arc::new(StringResource::new("/var/lib/quay")))
        .expect("register");
    let root = AnonRoot::new(session, AdminApis::new());

    assert_eq!(root.kill().stopped, 1);
    assert_eq!(root.kill().stopped, 0);
}

#[test]
fn admin_api_rejects_a_foreign_method_table() {
    let methods = MethodTable::builder::<Stranger>()
        .method("Hello", |_: &Stranger, (): ()| Ok(()))
        .build()
        .expect("stranger table");
    let error = AdminApi::new(Greeter { greeting: "hi" }, methods)
        .expect_err("mismatched table must fail");
    assert!(matches!(error, RegistryError::ReceiverMismatch { .. }));
}

#[test]
fn never_signal_is_not_aborted() {
    assert!(!AbortSignal::never().is_aborted());
}
