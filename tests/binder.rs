//! Integration tests for the import binding pass.
//!
//! These exercise the full path from a loaded image's import table through
//! the catalog, the synthetic address allocator, the registry, and the
//! image's jump-table patches.

use std::ops::Range;

use symflow::{
    models::{alloc, libc::EXIT_ADDR_KEY, stubs::STUB_LIBRARY},
    prelude::*,
    Error, Result,
};

/// Wraps an image and refuses the patch for one symbol, standing in for a
/// loader whose jump table rejects a write mid-pass.
struct PatchRejectingImage {
    inner: MemoryImage,
    reject: String,
}

impl LoadedImage for PatchRejectingImage {
    fn identity(&self) -> &str {
        self.inner.identity()
    }

    fn address_range(&self) -> Range<u64> {
        self.inner.address_range()
    }

    fn dependencies(&self) -> Vec<String> {
        self.inner.dependencies()
    }

    fn imports(&self) -> Vec<ImportEntry> {
        self.inner.imports()
    }

    fn patch_import(&mut self, symbol: &str, target: u64) -> Result<()> {
        if symbol == self.reject {
            return Err(Error::Patch {
                symbol: symbol.to_string(),
                message: "jump table entry is read-only".to_string(),
            });
        }
        self.inner.patch_import(symbol, target)
    }
}

fn libc_session() -> Session {
    Session::builder()
        .arch(ArchInfo::amd64())
        .library(libc_models())
        .build()
        .unwrap()
}

fn libc_image() -> MemoryImage {
    MemoryImage::new("app", 0x40_0000..0x41_0000).with_dependency("/lib/x86_64/libc.so.6")
}

#[test]
fn test_known_symbol_binds_library_model() {
    let session = libc_session();
    let mut image = libc_image().with_import(ImportEntry::unresolved("exit"));

    let report = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[0x40_0000..0x41_0000])
        .unwrap();

    let expected = alloc::allocate("libc.so.6", "exit", session.arch()).unwrap();
    assert_eq!(report.modeled, vec![("exit".to_string(), expected)]);
    assert!(report.fallback.is_empty());

    let binding = session.registry().lookup(expected).unwrap();
    assert_eq!(binding.model.name(), "Exit");
    assert_eq!(image.patches().get("exit"), Some(&expected));
}

#[test]
fn test_unknown_symbol_gets_unconstrained_fallback() {
    let session = libc_session();
    let mut image = libc_image().with_import(ImportEntry::unresolved("mystery"));

    let report = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[])
        .unwrap();

    let expected = alloc::allocate(STUB_LIBRARY, "mystery", session.arch()).unwrap();
    assert_eq!(report.fallback, vec![("mystery".to_string(), expected)]);

    // The stub carries the symbol it stands in for.
    let binding = session.registry().lookup(expected).unwrap();
    assert_eq!(binding.model.name(), "ReturnUnconstrained");
    assert_eq!(binding.config.text("resolves"), Some("mystery"));
    assert_eq!(image.patches().get("mystery"), Some(&expected));
}

#[test]
fn test_legacy_library_name_is_aliased() {
    // Models are registered under libc.so.6; a uClibc image depending on
    // libc.so.0 must still find them.
    let session = libc_session();
    let mut image = MemoryImage::new("app", 0x40_0000..0x41_0000)
        .with_dependency("/lib/libc.so.0")
        .with_import(ImportEntry::unresolved("exit"));

    let report = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[])
        .unwrap();

    assert_eq!(report.modeled.len(), 1);
    assert_eq!(report.modeled[0].0, "exit");
}

#[test]
fn test_excluded_symbol_stays_native() {
    let session = libc_session();
    let mut image = libc_image().with_import(ImportEntry::unresolved("exit"));

    let report = session
        .binder(Exclusions::none().with_name("exit"))
        .bind_imports(&mut image, &[])
        .unwrap();

    assert_eq!(report.native, vec!["exit".to_string()]);
    assert_eq!(report.bound_count(), 0);
    assert!(image.patches().is_empty());
    assert!(session.registry().is_empty());
}

#[test]
fn test_resolved_in_range_import_is_deferred_to_native() {
    let session = libc_session();
    let ranges = [0x40_0000..0x41_0000, 0x7f00_0000..0x7f10_0000];
    let mut image = libc_image()
        .with_import(ImportEntry::resolved("helper", 0x7f00_1000))
        .with_import(ImportEntry::resolved("dangling", 0xdead_0000));

    let report = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &ranges)
        .unwrap();

    // A target inside a loaded range is reachable code; a target outside is
    // not and falls back to the stub.
    assert_eq!(report.native, vec!["helper".to_string()]);
    assert_eq!(report.fallback.len(), 1);
    assert_eq!(report.fallback[0].0, "dangling");
}

#[test]
fn test_ignored_function_overrides_native_deferral() {
    let session = libc_session();
    let ranges = [0x7f00_0000..0x7f10_0000];
    let mut image = libc_image().with_import(ImportEntry::resolved("helper", 0x7f00_1000));

    let report = session
        .binder(Exclusions::none())
        .ignore_function("helper")
        .bind_imports(&mut image, &ranges)
        .unwrap();

    assert!(report.native.is_empty());
    assert_eq!(report.fallback.len(), 1);
    assert_eq!(report.fallback[0].0, "helper");
}

#[test]
fn test_binding_pass_is_reproducible() {
    let session = libc_session();

    let mut first = libc_image()
        .with_import(ImportEntry::unresolved("exit"))
        .with_import(ImportEntry::unresolved("mystery"));
    let mut second = libc_image()
        .with_import(ImportEntry::unresolved("exit"))
        .with_import(ImportEntry::unresolved("mystery"));

    let binder = session.binder(Exclusions::none());
    let report_a = binder.bind_imports(&mut first, &[]).unwrap();
    let bindings_after_first = session.registry().len();
    let report_b = binder.bind_imports(&mut second, &[]).unwrap();

    // Same addresses, same patches, and no duplicate registry entries.
    assert_eq!(report_a, report_b);
    assert_eq!(first.patches(), second.patches());
    assert_eq!(session.registry().len(), bindings_after_first);
}

#[test]
fn test_start_main_dependency_threads_exit_address() {
    let session = libc_session();
    let mut image = libc_image().with_import(ImportEntry::unresolved("__libc_start_main"));

    session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[])
        .unwrap();

    let start_addr = alloc::allocate("libc.so.6", "__libc_start_main", session.arch()).unwrap();
    let exit_addr = alloc::allocate("libc.so.6", "exit", session.arch()).unwrap();

    // Binding __libc_start_main pre-allocates exit and freezes its address
    // into the configuration, even though exit itself was never imported.
    let start = session.registry().lookup(start_addr).unwrap();
    assert_eq!(start.config.address(EXIT_ADDR_KEY), Some(exit_addr));

    let exit = session.registry().lookup(exit_addr).unwrap();
    assert_eq!(exit.model.name(), "Exit");
}

#[test]
fn test_predicate_failure_aborts_the_pass() {
    let session = libc_session();
    let mut image = libc_image().with_import(ImportEntry::unresolved("_Zn3foo"));

    let exclusions = Exclusions::none().with_predicate(|symbol| {
        if symbol.starts_with("_Z") {
            Err(Error::MalformedConstant("cannot demangle".to_string()))
        } else {
            Ok(false)
        }
    });

    let result = session.binder(exclusions).bind_imports(&mut image, &[]);
    assert!(matches!(result, Err(Error::Exclusion { .. })));
    assert!(image.patches().is_empty());
}

#[test]
fn test_patch_failure_keeps_earlier_bindings() {
    let session = libc_session();
    let mut image = PatchRejectingImage {
        inner: libc_image()
            .with_import(ImportEntry::unresolved("exit"))
            .with_import(ImportEntry::unresolved("__libc_start_main")),
        reject: "__libc_start_main".to_string(),
    };

    let result = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[]);
    assert!(matches!(result, Err(Error::Patch { .. })));

    // The pass failed partway through, but everything installed before the
    // failing patch stays valid: exit is still bound and still patched.
    let exit_addr = alloc::allocate("libc.so.6", "exit", session.arch()).unwrap();
    let binding = session.registry().lookup(exit_addr).unwrap();
    assert_eq!(binding.model.name(), "Exit");
    assert_eq!(image.inner.patches().get("exit"), Some(&exit_addr));
    assert!(!image.inner.patches().contains_key("__libc_start_main"));
}

#[test]
fn test_synthetic_addresses_respect_arch_alignment() {
    let session = Session::builder()
        .arch(ArchInfo::mips32())
        .library(libc_models())
        .build()
        .unwrap();
    let mut image = MemoryImage::new("app", 0x40_0000..0x41_0000)
        .with_dependency("libc.so.6")
        .with_import(ImportEntry::unresolved("exit"))
        .with_import(ImportEntry::unresolved("mystery"));

    let report = session
        .binder(Exclusions::none())
        .bind_imports(&mut image, &[])
        .unwrap();

    for (_, address) in report.modeled.iter().chain(report.fallback.iter()) {
        assert_eq!(address % session.arch().instruction_alignment(), 0);
        assert!(*address <= u32::MAX.into());
    }
}
