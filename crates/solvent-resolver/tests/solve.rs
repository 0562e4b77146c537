//! Fixture-table conformance tests for the solver.
//!
//! Each fixture declares a package universe (first entry is the root), an
//! optional lock, and either the expected assignment or the expected failure
//! with its responsible packages. Run with `RUST_LOG=solvent_resolver=trace`
//! to watch the search replay.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use solvent_core::{Dependency, Lockfile, Manifest, PackageName, Version};
use solvent_resolver::{
    MemoryProvider, MetadataProvider, ProviderError, Resolution, SolveFailure, Solver,
    SolverOptions,
};

/// One package version and its declared dependencies. An `id` without a
/// version ("a" instead of "a 1.0.0") registers the package with no versions.
struct Spec {
    id: &'static str,
    deps: &'static [(&'static str, &'static str)],
}

const fn spec(
    id: &'static str,
    deps: &'static [(&'static str, &'static str)],
) -> Spec {
    Spec { id, deps }
}

enum Expect {
    Solution(&'static [(&'static str, &'static str)]),
    Failure {
        package: &'static str,
        culprits: &'static [&'static str],
    },
}

struct Fixture {
    name: &'static str,
    /// First entry is the root project.
    packages: &'static [Spec],
    lock: &'static [(&'static str, &'static str)],
    force_latest: &'static [&'static str],
    downgrade: bool,
    want: Expect,
    /// Upper bound on `Resolution::attempts`; 0 means unchecked.
    max_attempts: usize,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        name: "no dependencies",
        packages: &[spec("root 1.0.0", &[])],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[]),
        max_attempts: 1,
    },
    Fixture {
        name: "simple dependency tree",
        packages: &[
            spec("root 1.0.0", &[("a", "1.0.0"), ("b", "1.0.0")]),
            spec("a 1.0.0", &[("aa", "1.0.0"), ("ab", "1.0.0")]),
            spec("aa 1.0.0", &[]),
            spec("ab 1.0.0", &[]),
            spec("b 1.0.0", &[("ba", "1.0.0"), ("bb", "1.0.0")]),
            spec("ba 1.0.0", &[]),
            spec("bb 1.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[
            ("a", "1.0.0"),
            ("aa", "1.0.0"),
            ("ab", "1.0.0"),
            ("b", "1.0.0"),
            ("ba", "1.0.0"),
            ("bb", "1.0.0"),
        ]),
        max_attempts: 6,
    },
    Fixture {
        name: "shared dependency with overlapping constraints",
        packages: &[
            spec("root 1.0.0", &[("a", "*"), ("b", "*")]),
            spec("a 1.0.0", &[("shared", ">=2.0.0, <4.0.0")]),
            spec("b 1.0.0", &[("shared", ">=3.0.0, <5.0.0")]),
            spec("shared 5.0.0", &[]),
            spec("shared 4.0.0", &[]),
            spec("shared 3.6.9", &[]),
            spec("shared 3.0.0", &[]),
            spec("shared 2.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "1.0.0"), ("b", "1.0.0"), ("shared", "3.6.9")]),
        max_attempts: 3,
    },
    Fixture {
        name: "newest version selected by default",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "2.0.0")]),
        max_attempts: 1,
    },
    Fixture {
        name: "downgrade mode selects oldest",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: true,
        want: Expect::Solution(&[("a", "1.0.0")]),
        max_attempts: 1,
    },
    Fixture {
        name: "disjoint sibling constraints fail",
        packages: &[
            spec("root 1.0.0", &[("a", "*"), ("b", "*")]),
            spec("a 1.0.0", &[("c", "=1.0.0")]),
            spec("b 1.0.0", &[("c", "=2.0.0")]),
            spec("c 1.0.0", &[]),
            spec("c 2.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Failure {
            package: "b",
            culprits: &["a", "b"],
        },
        max_attempts: 2,
    },
    Fixture {
        name: "locked version preferred",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
        ],
        lock: &[("a", "1.0.0")],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "1.0.0")]),
        max_attempts: 1,
    },
    Fixture {
        name: "force latest overrides lock",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
        ],
        lock: &[("a", "1.0.0")],
        force_latest: &["a"],
        downgrade: false,
        want: Expect::Solution(&[("a", "2.0.0")]),
        max_attempts: 1,
    },
    Fixture {
        name: "stale lock entry skipped",
        packages: &[
            spec("root 1.0.0", &[("a", ">=2.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
        ],
        lock: &[("a", "1.0.0")],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "2.0.0")]),
        max_attempts: 1,
    },
    Fixture {
        name: "no versions at all",
        packages: &[spec("root 1.0.0", &[("a", ">=1.0.0")]), spec("a", &[])],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Failure {
            package: "a",
            culprits: &["a"],
        },
        max_attempts: 1,
    },
    Fixture {
        name: "no version matches requirement",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0")]),
            spec("a 0.8.0", &[]),
            spec("a 0.9.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Failure {
            package: "a",
            culprits: &["a", "root"],
        },
        max_attempts: 1,
    },
    Fixture {
        name: "backjump to retroactively disallowed decision",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0"), ("b", "=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
            spec("b 1.0.0", &[("a", "<2.0.0")]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "1.0.0"), ("b", "1.0.0")]),
        max_attempts: 3,
    },
    Fixture {
        name: "backjump discards unrelated intervening decision",
        packages: &[
            spec("root 1.0.0", &[("a", ">=1.0.0"), ("x", "*"), ("b", "=1.0.0")]),
            spec("a 1.0.0", &[]),
            spec("a 2.0.0", &[]),
            spec("x 1.0.0", &[]),
            spec("x 2.0.0", &[]),
            spec("b 1.0.0", &[("a", "<2.0.0")]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "1.0.0"), ("x", "2.0.0"), ("b", "1.0.0")]),
        // A chronological backtracker would enumerate x's versions before
        // reconsidering a; the backjump goes straight to a.
        max_attempts: 5,
    },
    Fixture {
        name: "circular dependencies",
        packages: &[
            spec("root 1.0.0", &[("a", "1.0.0")]),
            spec("a 1.0.0", &[("b", "1.0.0")]),
            spec("b 1.0.0", &[("a", ">=1.0.0")]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "1.0.0"), ("b", "1.0.0")]),
        max_attempts: 2,
    },
    Fixture {
        name: "branch pinned by exact constraint",
        packages: &[
            spec("root 1.0.0", &[("a", "=main")]),
            spec("a 1.0.0", &[]),
            spec("a main", &[("b", ">=1.0.0")]),
            spec("b 1.0.0", &[]),
        ],
        lock: &[],
        force_latest: &[],
        downgrade: false,
        want: Expect::Solution(&[("a", "main"), ("b", "1.0.0")]),
        max_attempts: 2,
    },
];

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manifest_from(spec: &Spec) -> Option<Manifest> {
    let (name, version) = spec.id.split_once(' ')?;
    Some(Manifest::new(
        name,
        Version::parse(version),
        spec.deps
            .iter()
            .map(|(n, c)| Dependency::parse(n, c))
            .collect(),
    ))
}

fn build_provider(fixture: &Fixture) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    for spec in &fixture.packages[1..] {
        match manifest_from(spec) {
            Some(manifest) => provider.add(manifest),
            None => provider.register(spec.id),
        }
    }
    provider
}

fn build_lock(pairs: &[(&str, &str)]) -> Lockfile {
    pairs
        .iter()
        .map(|(n, v)| (PackageName::from(*n), Version::parse(v)))
        .collect()
}

fn run_fixture(fixture: &Fixture) -> Resolution {
    let provider = build_provider(fixture);
    let lock = build_lock(fixture.lock);
    let root = manifest_from(&fixture.packages[0]).expect("fixture root must carry a version");
    let force_latest: HashSet<PackageName> = fixture
        .force_latest
        .iter()
        .map(|n| PackageName::from(*n))
        .collect();

    let options = SolverOptions {
        downgrade: fixture.downgrade,
        ..Default::default()
    };
    let mut solver = Solver::with_options(&provider, &lock, options);
    let resolution = solver
        .solve(&root, &force_latest)
        .unwrap_or_else(|e| panic!("(fixture: {}) provider fault: {e}", fixture.name));

    if fixture.max_attempts > 0 {
        assert!(
            resolution.attempts <= fixture.max_attempts,
            "(fixture: {}) solver took {} attempts, expected {} or fewer",
            fixture.name,
            resolution.attempts,
            fixture.max_attempts
        );
    }

    match &fixture.want {
        Expect::Failure { package, culprits } => {
            let failure = resolution.failure.as_ref().unwrap_or_else(|| {
                panic!("(fixture: {}) solver succeeded, expected failure", fixture.name)
            });
            let SolveFailure::NoVersion(fail) = failure else {
                panic!(
                    "(fixture: {}) expected exhaustion failure, got: {failure}",
                    fixture.name
                );
            };
            assert_eq!(
                fail.name,
                PackageName::from(*package),
                "(fixture: {}) failure blamed the wrong package",
                fixture.name
            );

            let expected: BTreeSet<PackageName> =
                culprits.iter().map(|n| PackageName::from(*n)).collect();
            assert_eq!(
                failure.culprits(),
                expected,
                "(fixture: {}) wrong culprit set",
                fixture.name
            );
            assert!(
                resolution.projects.is_empty(),
                "(fixture: {}) failed solve must not report projects",
                fixture.name
            );
        }
        Expect::Solution(pairs) => {
            if let Some(failure) = &resolution.failure {
                panic!("(fixture: {}) solver failed: {failure}", fixture.name);
            }
            let expected: BTreeMap<PackageName, Version> = pairs
                .iter()
                .map(|(n, v)| (PackageName::from(*n), Version::parse(v)))
                .collect();
            assert_eq!(
                resolution.projects, expected,
                "(fixture: {}) wrong assignment",
                fixture.name
            );

            let root = manifest_from(&fixture.packages[0]).expect("checked above");
            verify_solution(&provider, &root, &resolution.projects, fixture.name);
        }
    }

    resolution
}

/// Soundness and closure completeness: every dependency declared by the root
/// or by any chosen manifest must be present in the assignment at a version
/// satisfying the depender's constraint.
fn verify_solution(
    provider: &MemoryProvider,
    root: &Manifest,
    projects: &BTreeMap<PackageName, Version>,
    fixture_name: &str,
) {
    let mut manifests = vec![root.clone()];
    for (name, version) in projects {
        manifests.push(
            provider
                .manifest(name, version)
                .unwrap_or_else(|e| panic!("(fixture: {fixture_name}) {e}")),
        );
    }

    for manifest in &manifests {
        for dep in &manifest.dependencies {
            if dep.name == root.name {
                continue;
            }
            let chosen = projects.get(&dep.name).unwrap_or_else(|| {
                panic!(
                    "(fixture: {fixture_name}) {} requires {} but it is missing from the result",
                    manifest.name, dep.name
                )
            });
            assert!(
                dep.constraint.matches(chosen),
                "(fixture: {fixture_name}) {}@{} violates {} from {}",
                dep.name,
                chosen,
                dep.constraint,
                manifest.name
            );
        }
    }
}

#[test]
fn basic_solves() {
    init_logging();
    for fixture in FIXTURES {
        run_fixture(fixture);
    }
}

#[test]
fn attempts_equal_closure_size_when_unambiguous() {
    init_logging();
    let fixture = FIXTURES
        .iter()
        .find(|f| f.name == "simple dependency tree")
        .expect("fixture table changed");
    let resolution = run_fixture(fixture);
    assert_eq!(resolution.attempts, 6);
}

#[test]
fn lock_preference_costs_one_attempt() {
    init_logging();
    let fixture = FIXTURES
        .iter()
        .find(|f| f.name == "locked version preferred")
        .expect("fixture table changed");
    let resolution = run_fixture(fixture);
    assert_eq!(resolution.attempts, 1);
}

#[test]
fn resolving_again_with_own_result_as_lock_is_idempotent() {
    init_logging();
    let fixture = FIXTURES
        .iter()
        .find(|f| f.name == "shared dependency with overlapping constraints")
        .expect("fixture table changed");
    let first = run_fixture(fixture);

    let provider = build_provider(fixture);
    let lock: Lockfile = first
        .projects
        .iter()
        .map(|(n, v)| (n.clone(), v.clone()))
        .collect();
    let root = manifest_from(&fixture.packages[0]).expect("fixture root must carry a version");

    let mut solver = Solver::new(&provider, &lock);
    let second = solver.solve(&root, &HashSet::new()).expect("provider fault");

    assert!(second.is_success());
    assert_eq!(second.projects, first.projects);
}

#[test]
fn provider_faults_are_not_solve_failures() {
    init_logging();
    let mut provider = MemoryProvider::new();
    provider.add(Manifest::new("a", Version::parse("1.0.0"), vec![]));
    let root = Manifest::new(
        "root",
        Version::parse("1.0.0"),
        vec![Dependency::parse("ghost", "*")],
    );

    let mut solver = Solver::new(&provider, &solvent_core::EmptyLock);
    let err = solver.solve(&root, &HashSet::new());
    assert!(matches!(err, Err(ProviderError::UnknownPackage { .. })));
}

#[test]
fn canceled_solve_returns_distinct_failure() {
    init_logging();
    let mut provider = MemoryProvider::new();
    provider.add(Manifest::new("a", Version::parse("1.0.0"), vec![]));
    let root = Manifest::new(
        "root",
        Version::parse("1.0.0"),
        vec![Dependency::parse("a", "*")],
    );

    let options = SolverOptions::default();
    options.cancel.cancel();
    let mut solver = Solver::with_options(&provider, &solvent_core::EmptyLock, options);
    let resolution = solver.solve(&root, &HashSet::new()).expect("provider fault");

    assert!(matches!(resolution.failure, Some(SolveFailure::Canceled)));
    assert!(resolution.projects.is_empty());
}
