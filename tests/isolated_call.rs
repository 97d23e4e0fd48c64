use boxcache::{
    isolated_call, DriverLog, InvocationSpec, OverlapError, ProcessSpawn, RecordingSpawn,
    TypedArg, TypedPath,
};
use pretty_assertions::assert_eq;
use std::fs;

fn driver_log() -> (tempfile::TempDir, DriverLog) {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    let log = DriverLog::open(&dir.path().join("all.log")).unwrap();
    (dir, log)
}

/// Scenario 1: a gcc-like compile with `strip_box_in_dir_prefix`, cache enabled.
#[test]
fn happy_path_compile_caches_two_declared_outputs() {
    let work_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    fs::write(
        work_dir.path().join("foo.c"),
        "int main() { return 0; }\n",
    )
    .unwrap();

    // no real compiler is assumed to exist in every environment this runs in, so the "compiler"
    // here is /bin/sh writing both declared outputs directly; this exercises the same staging,
    // harvest, and cache-store path a real gcc invocation with `-fstack-usage` would, where the
    // `.su` file is an extra_output: produced by convention, never named on the command line.
    let mut spec = InvocationSpec::new(vec![
        TypedArg::path(TypedPath::exec("/bin/sh").unwrap()),
        TypedArg::literal("-c"),
        TypedArg::literal("cp \"$1\" \"$2\" && echo warning > ../out/foo.su"),
        TypedArg::literal("sh"),
        TypedArg::path(TypedPath::input("foo.c").unwrap()),
        TypedArg::path(TypedPath::output("foo.o").unwrap()),
    ]);
    spec.extra_outputs = vec![TypedPath::output("foo.su").unwrap()];
    spec.cache_dir = Some(cache_dir.path().to_path_buf());

    let (_log_dir, log) = driver_log();
    let spawn = ProcessSpawn::default();
    let status = isolated_call(&spec, work_dir.path(), &spawn, &log).unwrap();

    assert_eq!(status, 0);
    assert!(work_dir.path().join("foo.o").exists());
    assert!(work_dir.path().join("foo.su").exists());

    let fp = boxcache::fingerprint(&spec).unwrap();
    let manifest = cache_dir
        .path()
        .join("manifests")
        .join(&fp[..2])
        .join(format!("{}-output.manifest", fp));
    let manifest_content = fs::read_to_string(&manifest).unwrap();
    assert_eq!(manifest_content.lines().count(), 2);

    let artifacts_dir = cache_dir.path().join("artifacts").join("sha256");
    assert!(fs::read_dir(&artifacts_dir).unwrap().count() >= 2);
}

/// Scenario 2: a second, byte-identical invocation is served entirely from the cache.
#[test]
fn cache_hit_restores_outputs_without_spawning() {
    let work_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    fs::write(work_dir.path().join("foo.c"), "payload\n").unwrap();

    let mut spec = InvocationSpec::new(vec![
        TypedArg::path(TypedPath::exec("/bin/cp").unwrap()),
        TypedArg::path(TypedPath::input("foo.c").unwrap()),
        TypedArg::path(TypedPath::output("foo.o").unwrap()),
    ]);
    spec.cache_dir = Some(cache_dir.path().to_path_buf());

    let (_log_dir, log) = driver_log();
    let real_spawn = ProcessSpawn::default();
    assert_eq!(
        isolated_call(&spec, work_dir.path(), &real_spawn, &log).unwrap(),
        0
    );
    fs::remove_file(work_dir.path().join("foo.o")).unwrap();

    let stub = RecordingSpawn::new(0);
    let status = isolated_call(&spec, work_dir.path(), &stub, &log).unwrap();
    assert_eq!(status, 0);
    assert!(stub.calls().is_empty());
    assert_eq!(
        fs::read(work_dir.path().join("foo.o")).unwrap(),
        b"payload\n"
    );
}

/// Scenario 3: a file produced by the command but not declared as an output fails the call.
#[test]
fn undeclared_output_fails_the_call() {
    let work_dir = tempfile::tempdir().unwrap();
    let mut spec = InvocationSpec::new(vec![
        TypedArg::path(TypedPath::exec("/bin/sh").unwrap()),
        TypedArg::literal("-c"),
        TypedArg::literal("touch ../out/foo.o && touch ../out/foo.su"),
    ]);
    // foo.su is produced but never declared (compare with the happy path above).
    spec.extra_outputs = vec![TypedPath::output("foo.o").unwrap()];

    let (_log_dir, log) = driver_log();
    let spawn = ProcessSpawn::default();
    let err = isolated_call(&spec, work_dir.path(), &spawn, &log).unwrap_err();

    assert!(format!("{}", err).contains("contain undeclared outputs ['foo.su']"));
    assert!(!work_dir.path().join("foo.o").exists());
    assert!(!work_dir.path().join("foo.su").exists());
}

/// Scenario 4: a name declared as both an input and an output is rejected before spawning.
#[test]
fn input_output_overlap_is_rejected_before_spawning() {
    let work_dir = tempfile::tempdir().unwrap();
    fs::write(work_dir.path().join("foo.c"), "x").unwrap();
    let spec = InvocationSpec::new(vec![
        TypedArg::path(TypedPath::exec("/bin/cp").unwrap()),
        TypedArg::path(TypedPath::input("foo.c").unwrap()),
        TypedArg::path(TypedPath::output("foo.c").unwrap()),
    ]);

    let (_log_dir, log) = driver_log();
    let spawn = RecordingSpawn::new(0);
    let err = isolated_call(&spec, work_dir.path(), &spawn, &log).unwrap_err();

    assert_eq!(
        format!("{}", err),
        "Input files and output files overlap for {'foo.c'}"
    );
    assert!(matches!(
        err,
        boxcache::BoxError::Overlap(OverlapError::InputOutput(_))
    ));
    assert!(spawn.calls().is_empty());
}

/// Scenario 5: environment key ordering does not affect the fingerprint.
#[test]
fn fingerprint_is_invariant_under_env_key_ordering() {
    let mut spec_a = InvocationSpec::new(vec![TypedArg::literal("true")]);
    spec_a
        .typed_env
        .insert("B".to_owned(), boxcache::EnvValue::Literal("1".to_owned()));
    spec_a
        .typed_env
        .insert("A".to_owned(), boxcache::EnvValue::Literal("2".to_owned()));

    let mut spec_b = InvocationSpec::new(vec![TypedArg::literal("true")]);
    spec_b
        .typed_env
        .insert("A".to_owned(), boxcache::EnvValue::Literal("2".to_owned()));
    spec_b
        .typed_env
        .insert("B".to_owned(), boxcache::EnvValue::Literal("1".to_owned()));

    assert_eq!(
        boxcache::fingerprint(&spec_a).unwrap(),
        boxcache::fingerprint(&spec_b).unwrap()
    );
}

/// Scenario 6: a single changed input byte changes the fingerprint and defeats a cache hit.
#[test]
fn fingerprint_is_sensitive_to_input_content_and_cache_then_misses() {
    let work_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();

    fs::write(work_dir.path().join("foo.c"), "aaa").unwrap();
    let spec = InvocationSpec::new(vec![
        TypedArg::path(TypedPath::exec("/bin/cp").unwrap()),
        TypedArg::path(TypedPath::input("foo.c").unwrap()),
        TypedArg::path(TypedPath::output("foo.o").unwrap()),
    ]);
    let mut spec_with_cache = spec.clone();
    spec_with_cache.cache_dir = Some(cache_dir.path().to_path_buf());

    let (_log_dir, log) = driver_log();
    let spawn = ProcessSpawn::default();
    isolated_call(&spec_with_cache, work_dir.path(), &spawn, &log).unwrap();
    let fp_before = boxcache::fingerprint(&spec_with_cache).unwrap();

    fs::write(work_dir.path().join("foo.c"), "aab").unwrap();
    let fp_after = boxcache::fingerprint(&spec_with_cache).unwrap();
    assert_ne!(fp_before, fp_after);

    fs::remove_file(work_dir.path().join("foo.o")).unwrap();
    let recording = RecordingSpawn::new(0);
    isolated_call(&spec_with_cache, work_dir.path(), &recording, &log).unwrap();
    // the changed input misses the cache, so the child is spawned again.
    assert_eq!(recording.calls().len(), 1);
}
