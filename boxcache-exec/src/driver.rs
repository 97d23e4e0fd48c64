use crate::errors::BoxError;
use crate::logging::DriverLog;
use crate::sandbox::{list_relative_files, precreate_output_dirs, set_permissions, stage_inputs, SandboxRoot};
use crate::scrub::scrub_outputs;
use crate::spawn::Spawn;
use boxcache_cache::{fingerprint, load, store, CachePaths};
use boxcache_store::move_back;
use boxcache_types::{EnvValue, InvocationSpec, TypedArg};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Runs one sandboxed invocation to completion (component F): validates the declared name sets,
/// probes the cache, stages inputs and spawns the child on a miss, harvests declared outputs back
/// into `work_dir`, and restores the caller's working directory on every exit path.
///
/// Returns the exit status reported by `spawn` (`0` on a cache hit, where the child is never
/// spawned at all). Fails with a [`BoxError`] on any driver-detected violation: name overlap,
/// an unreadable fingerprint input, an I/O failure during staging or harvest, or leftover files
/// in the sandbox's output root after every declared output has been moved out.
pub fn isolated_call(
    spec: &InvocationSpec,
    work_dir: &Path,
    spawn: &dyn Spawn,
    log: &DriverLog,
) -> Result<i32, BoxError> {
    spec.validate_overlap()?;

    let inputs = spec.declared_inputs();
    let outputs = spec.declared_outputs();
    let temp_dirs = spec.declared_temp_dirs();

    let fingerprint_hex = fingerprint(spec)?;
    log.info(&format!(
        "Fingerprint {} for invocation in {}",
        fingerprint_hex,
        work_dir.display()
    ));

    let cache_paths = spec
        .cache_dir
        .as_ref()
        .map(|dir| CachePaths::new(dir, &spec.hash_name, &fingerprint_hex));

    if let Some(paths) = &cache_paths {
        if load(&outputs, work_dir, paths) {
            log.info("Cache hit, child process not spawned");
            return Ok(0);
        }
        log.info("Cache miss, proceeding with a sandboxed call");
    }

    let sandbox = SandboxRoot::create(&sandbox_tmp_root(&spec.cache_dir))?;
    stage_inputs(&sandbox.in_dir, work_dir, &inputs)?;
    precreate_output_dirs(&sandbox.out_dir, &outputs)?;
    for dir in &temp_dirs {
        fs::create_dir_all(sandbox.temp_dir.join(dir.as_boxed()))?;
    }

    env::set_current_dir(&sandbox.in_dir)?;
    set_permissions(&sandbox.in_dir, 0o500)?;

    let args: Vec<String> = spec
        .typed_args
        .iter()
        .map(TypedArg::boxed_arg_string)
        .collect();
    let env_vars = resolve_env(spec);

    let exit_status = spawn.run(&args, &env_vars, &sandbox.in_dir, spec.shell, spec.timeout)?;

    set_permissions(&sandbox.in_dir, 0o700)?;

    if exit_status != 0 {
        log.info(&format!("Child exited with status {}", exit_status));
        return Ok(exit_status);
    }

    env::set_current_dir(&sandbox.out_dir)?;

    if spec.strip_box_in_dir_prefix {
        let prefix = sandbox.in_dir.to_string_lossy().into_owned();
        let boxed_names: Vec<&Path> = outputs.iter().map(|o| o.as_boxed()).collect();
        scrub_outputs(&sandbox.out_dir, &boxed_names, &prefix)?;
    }

    if let Some(paths) = &cache_paths {
        if store(&outputs, &sandbox.out_dir, paths) {
            log.info("Stored outputs in cache");
        } else {
            log.warn("Could not store outputs in cache");
        }
    }

    for output in &outputs {
        let src = sandbox.out_dir.join(output.as_boxed());
        let dst = work_dir.join(output.as_boxed());
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        if !move_back(&src, &dst) {
            return Err(BoxError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "cannot move output {} back to {}",
                    src.display(),
                    dst.display()
                ),
            )));
        }
    }

    let leftovers = list_relative_files(&sandbox.out_dir)?;
    if !leftovers.is_empty() {
        return Err(BoxError::UndeclaredOutput {
            root: sandbox.out_dir.clone(),
            names: leftovers,
        });
    }

    Ok(0)
}

/// Where sandbox roots are created: under `<cache_dir>/sandboxes` when caching is enabled (so the
/// cache directory stays the one place this crate writes outside `work_dir`), else the system
/// temp directory.
fn sandbox_tmp_root(cache_dir: &Option<PathBuf>) -> PathBuf {
    cache_dir
        .as_ref()
        .map(|dir| dir.join("sandboxes"))
        .unwrap_or_else(env::temp_dir)
}

/// Resolves `typed_env` into the plain string map `Spawn::run` expects: a `TempDir` value becomes
/// the sandbox-relative path (with its `../temp` prefix) the child will actually see.
fn resolve_env(spec: &InvocationSpec) -> HashMap<String, String> {
    spec.typed_env
        .iter()
        .map(|(name, value)| {
            let resolved = match value {
                EnvValue::Literal(s) => s.clone(),
                EnvValue::TempDir(p) => p.prefixed_boxed_path().to_string_lossy().into_owned(),
            };
            (name.clone(), resolved)
        })
        .collect()
}
