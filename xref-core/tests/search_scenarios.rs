use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xref_core::{
    normalize_path, Config, DependencyGraphBuilder, MatchType, PathResolver, SearchEngine,
    SearchQuery, SearchType,
};

/// Write `files` (relative path, content) under a fresh temp dir
fn create_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

fn user_app_tree() -> TempDir {
    create_tree(&[
        ("src/user.ts", "export function getUser() {}\n"),
        ("src/app.ts", "import { getUser } from './user'\n\nconsole.log(getUser());\n"),
    ])
}

fn engine() -> SearchEngine {
    SearchEngine::new(Config::default())
}

#[test]
fn test_definition_search_finds_the_declaration() {
    let dir = user_app_tree();
    let outcome = engine()
        .search(
            SearchQuery::new("getUser").with_search_type(SearchType::Definition),
            dir.path(),
        )
        .unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let m = &outcome.matches[0];
    assert_eq!(m.file, "src/user.ts");
    assert_eq!(m.line, 1);
    assert_eq!(m.match_type, MatchType::Definition);
    assert_eq!(m.confidence, 1.0);
}

#[test]
fn test_reverse_dependency_search_includes_importer() {
    let dir = user_app_tree();
    let outcome = engine()
        .search(
            SearchQuery::new("getUser").with_search_type(SearchType::ReverseDependencies),
            dir.path(),
        )
        .unwrap();

    let importer = outcome
        .matches
        .iter()
        .find(|m| m.file == "src/app.ts")
        .expect("src/app.ts should be reported as importing src/user.ts");
    assert_eq!(importer.line, 1);
    assert_eq!(importer.match_type, MatchType::ReverseDependencies);
    assert_eq!(importer.confidence, 1.0);
}

#[test]
fn test_fuzzy_search_tolerates_typo() {
    let dir = create_tree(&[("src/user.ts", "export function getUser() {}\n")]);

    let fuzzy = engine()
        .search(
            SearchQuery::new("getUsr")
                .with_search_type(SearchType::Definition)
                .with_fuzzy(true),
            dir.path(),
        )
        .unwrap();
    assert!(!fuzzy.matches.is_empty());
    for m in &fuzzy.matches {
        assert!(m.confidence > 0.6 && m.confidence <= 0.95, "confidence {}", m.confidence);
    }

    let exact = engine()
        .search(
            SearchQuery::new("getUsr").with_search_type(SearchType::Definition),
            dir.path(),
        )
        .unwrap();
    assert!(exact.matches.is_empty());
}

#[test]
fn test_oversized_file_is_skipped_without_error() {
    let dir = user_app_tree();
    let mut big = String::with_capacity(6 * 1024 * 1024 + 64);
    while big.len() < 6 * 1024 * 1024 {
        big.push_str("const value = getUser();\n");
    }
    fs::write(dir.path().join("src/huge.ts"), big).unwrap();

    let outcome = engine()
        .search(SearchQuery::new("getUser"), dir.path())
        .unwrap();
    assert!(outcome.matches.iter().all(|m| m.file != "src/huge.ts"));
    assert!(outcome.files_skipped >= 1);
    assert!(!outcome.matches.is_empty());
}

#[test]
fn test_max_results_caps_and_orders_matches() {
    let files: Vec<(String, String)> = (0..16)
        .map(|i| {
            let body = (0..5).map(|j| format!("v{} = token\n", j)).collect::<String>();
            (format!("pkg/mod_{:02}.py", i), body)
        })
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let dir = create_tree(&refs);

    let outcome = engine()
        .search(
            SearchQuery::new("token")
                .with_search_type(SearchType::Usage)
                .with_max_results(50),
            dir.path(),
        )
        .unwrap();

    assert_eq!(outcome.matches.len(), 50);
    assert!(outcome.truncated);
    let keys: Vec<(String, usize)> = outcome
        .matches
        .iter()
        .map(|m| (m.file.clone(), m.line))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys[0], ("pkg/mod_00.py".to_string(), 1));
    assert_eq!(keys[49], ("pkg/mod_09.py".to_string(), 5));
}

#[test]
fn test_every_response_respects_confidence_and_cap() {
    let dir = user_app_tree();
    for fuzzy in [false, true] {
        let outcome = engine()
            .search(
                SearchQuery::new("getUser").with_fuzzy(fuzzy).with_max_results(3),
                dir.path(),
            )
            .unwrap();
        assert!(outcome.matches.len() <= 3);
        let distinct: HashSet<(&str, usize, MatchType)> = outcome
            .matches
            .iter()
            .map(|m| (m.file.as_str(), m.line, m.match_type))
            .collect();
        assert_eq!(distinct.len(), outcome.matches.len());
        for m in &outcome.matches {
            assert!(m.confidence > 0.0 && m.confidence <= 1.0);
            if !fuzzy {
                assert_eq!(m.confidence, 1.0);
            }
        }
    }
}

#[test]
fn test_identical_requests_return_identical_results() {
    let dir = user_app_tree();
    let query = SearchQuery::new("getUser").with_fuzzy(true);
    let first = engine().search(query.clone(), dir.path()).unwrap();
    let second = engine().search(query, dir.path()).unwrap();
    assert_eq!(first.matches, second.matches);
}

#[test]
fn test_single_result_is_the_best_match() {
    let dir = create_tree(&[
        ("a.py", "getuser = 1\n"),
        ("c.py", "print(getUser)\n"),
        ("b.py", "x = 0\ny = getUser\n"),
    ]);
    let outcome = engine()
        .search(
            SearchQuery::new("getUser")
                .with_search_type(SearchType::Usage)
                .with_fuzzy(true)
                .with_max_results(1),
            dir.path(),
        )
        .unwrap();
    assert_eq!(outcome.matches.len(), 1);
    let best = &outcome.matches[0];
    assert_eq!((best.file.as_str(), best.line), ("b.py", 2));
    assert_eq!(best.confidence, 1.0);
}

#[test]
fn test_relative_imports_round_trip_through_resolver() {
    let dir = create_tree(&[
        ("web/lib/format.ts", "export const format = 1\n"),
        ("web/pages/home.ts", "import { format } from '../lib/format'\n"),
        ("py/app/models.py", "class User: pass\n"),
        ("py/app/views.py", "from .models import User\n"),
    ]);
    let resolver = PathResolver::new();

    let home = dir.path().join("web/pages/home.ts");
    assert_eq!(
        resolver.resolve("../lib/format", &home),
        Some(normalize_path(&dir.path().join("web/lib/format.ts")))
    );

    let views = dir.path().join("py/app/views.py");
    assert_eq!(
        resolver.resolve(".models", &views),
        Some(normalize_path(&dir.path().join("py/app/models.py")))
    );
}

#[test]
fn test_mutual_imports_terminate() {
    let dir = create_tree(&[
        ("a.ts", "import { b } from './b'\nexport const a = 1\n"),
        ("b.ts", "import { a } from './a'\nexport const b = 2\n"),
    ]);
    let resolver = PathResolver::new();
    let walk = Config::default().walk;
    let graph = DependencyGraphBuilder::new(&resolver, &walk);

    let a = normalize_path(dir.path()).join("a.ts");
    let deps = graph.deep_dependencies(&a, 3, &mut HashSet::new());
    let b = normalize_path(dir.path()).join("b.ts");
    assert_eq!(deps.iter().filter(|p| **p == b).count(), 1);
    assert!(!deps.contains(&a));
}

#[test]
fn test_missing_base_path_is_reported_not_raised() {
    let dir = user_app_tree();
    let err = engine()
        .search(SearchQuery::new("getUser").with_base_path("does/not/exist"), dir.path())
        .unwrap_err();
    assert!(err.is_recoverable());
    assert!(xref_core::report::recoverable_error(&err).contains("does/not/exist"));
}

#[test]
fn test_analysis_lists_transitive_dependencies() {
    let dir = create_tree(&[
        ("src/app.ts", "import { getUser } from './user'\n"),
        ("src/user.ts", "import { query } from './db'\nexport function getUser() {}\n"),
        ("src/db.ts", "export function query() {}\n"),
    ]);
    let analysis = engine()
        .analyze_file(
            "src/app.ts",
            dir.path(),
            xref_core::AnalysisOptions {
                imports: true,
                dependency_depth: Some(2),
                reverse_dependencies: false,
            },
        )
        .unwrap();
    assert_eq!(
        analysis.dependencies.unwrap(),
        vec!["src/user.ts".to_string(), "src/db.ts".to_string()]
    );
    let imports = analysis.imports.unwrap();
    assert_eq!(imports[0].resolved_path.as_deref(), Some(Path::new("src/user.ts")));
}
