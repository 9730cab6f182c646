use std::fs;
use std::path::{Path, PathBuf};

use collision_core::{
    CollisionDetector, DeclarationGroup, DetectionConfig, DetectionError, DetectionResult,
    Location, ParseError,
};
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, contents).expect("write file");
    path
}

fn config(root: &Path, scan: &[&str], exclude: &[&str], tolerant: bool) -> DetectionConfig {
    let scan: Vec<PathBuf> = scan.iter().map(|p| root.join(p)).collect();
    let exclude: Vec<PathBuf> = exclude.iter().map(|p| root.join(p)).collect();
    DetectionConfig::new(&scan, &exclude, &["php".to_string()], root, tolerant)
        .expect("valid config")
}

fn detect(root: &Path, scan: &[&str]) -> DetectionResult {
    CollisionDetector::new(config(root, scan, &[], false))
        .detect()
        .expect("detection succeeds")
}

fn locations(result: &DetectionResult, group: DeclarationGroup, name: &str) -> Vec<Location> {
    result
        .collisions
        .get(group, name)
        .unwrap_or_else(|| panic!("expected collision for {name}: {:#?}", result.collisions))
        .to_vec()
}

const DECLARATIONS: &str = "<?php\nnamespace Foo;\nclass X {}\nfunction y() {}\nconst Z = 1;\n";

#[test]
fn reports_each_group_across_two_files() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/File1.php", DECLARATIONS);
    write_file(tmp.path(), "src/File2.php", DECLARATIONS);

    let result = detect(tmp.path(), &["src"]);
    assert_eq!(result.files_analysed, 2);
    assert_eq!(result.files_excluded, 0);
    assert_eq!(result.collisions.len(), 3);

    for (group, name, line) in [
        (DeclarationGroup::Type, "Foo\\X", 3),
        (DeclarationGroup::Function, "Foo\\y", 4),
        (DeclarationGroup::Constant, "Foo\\Z", 5),
    ] {
        assert_eq!(
            locations(&result, group, name),
            vec![
                Location::new("src/File1.php", line),
                Location::new("src/File2.php", line),
            ]
        );
    }
}

#[test]
fn detection_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "a/One.php", DECLARATIONS);
    write_file(tmp.path(), "b/Two.php", DECLARATIONS);
    write_file(tmp.path(), "b/c/Three.php", "<?php class Lone {}");

    let detector = CollisionDetector::new(config(tmp.path(), &["a", "b"], &[], false));
    let first = detector.detect().unwrap();
    let second = detector.detect().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn root_order_does_not_change_location_order() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "a/Dup.php", "<?php class Dup {}");
    write_file(tmp.path(), "b/Dup.php", "<?php class Dup {}");

    let forward = detect(tmp.path(), &["a", "b"]);
    let backward = detect(tmp.path(), &["b", "a"]);
    let expected = vec![Location::new("a/Dup.php", 1), Location::new("b/Dup.php", 1)];
    assert_eq!(locations(&forward, DeclarationGroup::Type, "Dup"), expected);
    assert_eq!(locations(&backward, DeclarationGroup::Type, "Dup"), expected);
}

#[test]
fn groups_stay_isolated() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "one.php", "<?php const FOO = 1; function foo() {}");
    write_file(tmp.path(), "two.php", "<?php function FOO() {} class foo {}");

    let result = detect(tmp.path(), &["."]);
    assert_eq!(result.files_analysed, 2);
    assert!(result.collisions.is_empty(), "{:#?}", result.collisions);
}

#[test]
fn nested_declarations_do_not_collide() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "groups.php",
        r#"<?php
class Go {
    public function run() {
        $fn = function () {};
        $anon = new class {
            const Go = 1;
            function Go() {}
        };
    }
}
function helper() {
    class Go {}
}
"#,
    );

    let result = detect(tmp.path(), &["."]);
    assert!(result.collisions.is_empty(), "{:#?}", result.collisions);
}

#[test]
fn use_statements_contribute_nothing() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "use-statement/importer.php",
        "<?php\nuse function external\\namespacedFunction;\nuse const external\\NAMESPACED_CONST;\n",
    );
    write_file(
        tmp.path(),
        "use-statement/other.php",
        "<?php\nnamespace Foo;\nuse function external\\namespacedFunction;\nuse Bar\\{ function namespacedFunction, const NAMESPACED_CONST };\n",
    );

    let result = detect(tmp.path(), &["use-statement"]);
    assert_eq!(result.files_analysed, 2);
    assert!(result.collisions.is_empty(), "{:#?}", result.collisions);
}

#[test]
fn repeated_namespaces_in_one_file() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "multiple-namespaces.php",
        "<?php\nnamespace Foo;\nclass X {}\nnamespace Bar;\nfunction unrelated() {}\nnamespace Foo;\nclass X {}\n",
    );
    write_file(
        tmp.path(),
        "multiple-namespaces-braced.php",
        "<?php\nnamespace Foo {\n    class X {}\n}\nnamespace Bar {\n    function unrelated2() {}\n}\nnamespace Foo {\n    class X {}\n}\n",
    );

    let result = detect(tmp.path(), &["multiple-namespaces.php"]);
    assert_eq!(
        locations(&result, DeclarationGroup::Type, "Foo\\X"),
        vec![
            Location::new("multiple-namespaces.php", 3),
            Location::new("multiple-namespaces.php", 7),
        ]
    );

    let result = detect(tmp.path(), &["multiple-namespaces-braced.php"]);
    assert_eq!(
        locations(&result, DeclarationGroup::Type, "Foo\\X"),
        vec![
            Location::new("multiple-namespaces-braced.php", 3),
            Location::new("multiple-namespaces-braced.php", 9),
        ]
    );
}

#[test]
fn conditional_declarations_are_scanned_only_at_top_level() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "fatal-error/code.php",
        "<?php\nclass Exists {}\nif (!class_exists('Exists')) {\n    class Exists {}\n}\nclass Exists {}\n",
    );

    let result = detect(tmp.path(), &["fatal-error"]);
    assert_eq!(
        locations(&result, DeclarationGroup::Type, "Exists"),
        vec![
            Location::new("fatal-error/code.php", 2),
            Location::new("fatal-error/code.php", 6),
        ]
    );
}

#[test]
fn strict_mode_aborts_on_parse_failure() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "parse-error/code.php", "<?php\nclass Broken {\n");

    let err = CollisionDetector::new(config(tmp.path(), &["parse-error"], &[], false))
        .detect()
        .unwrap_err();
    let DetectionError::Parse(parse) = err;
    assert!(matches!(parse, ParseError::Syntax { .. }));
    assert!(parse.path().ends_with("parse-error/code.php"));
    assert!(parse.to_string().contains("Unable to parse"));
}

#[test]
fn strict_mode_reports_the_first_failure_in_enumeration_order() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/a.php", "<?php }");
    write_file(tmp.path(), "src/b.php", "<?php {");

    let err = CollisionDetector::new(config(tmp.path(), &["src"], &[], false))
        .detect()
        .unwrap_err();
    let DetectionError::Parse(parse) = err;
    assert!(parse.path().ends_with("src/a.php"));
}

#[test]
fn tolerant_mode_counts_parse_failures_as_excluded() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "parse-error/code.php", "<?php\nclass Broken {\n");

    let result = CollisionDetector::new(config(tmp.path(), &["parse-error"], &[], true))
        .detect()
        .unwrap();
    assert_eq!(result.files_analysed, 0);
    assert_eq!(result.files_excluded, 1);
    assert!(result.collisions.is_empty());
}

#[cfg(unix)]
#[test]
fn symlinked_directories_do_not_duplicate_declarations() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/real/A.php", "<?php class A {}");
    symlink(tmp.path().join("src/real"), tmp.path().join("src/link")).unwrap();
    symlink(tmp.path().join("src"), tmp.path().join("src/real/loop")).unwrap();

    let result = detect(tmp.path(), &["src"]);
    assert_eq!(result.files_analysed, 1);
    assert_eq!(result.files_excluded, 0);
    assert!(result.collisions.is_empty());
}

#[cfg(unix)]
#[test]
fn unreadable_files_follow_the_parse_failure_policy() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/a.php", "<?php class A {}");
    symlink(tmp.path().join("missing.php"), tmp.path().join("src/b.php")).unwrap();

    let err = CollisionDetector::new(config(tmp.path(), &["src"], &[], false))
        .detect()
        .unwrap_err();
    let DetectionError::Parse(parse) = err;
    assert!(matches!(parse, ParseError::Unreadable { .. }));
    assert!(parse.path().ends_with("src/b.php"));
    assert!(parse.to_string().contains("Unable to get contents of"));

    let result = CollisionDetector::new(config(tmp.path(), &["src"], &[], true))
        .detect()
        .unwrap();
    assert_eq!(result.files_analysed, 1);
    assert_eq!(result.files_excluded, 1);
}

#[test]
fn walk_errors_follow_the_parse_failure_policy() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "gone/A.php", "<?php class A {}");
    let strict = CollisionDetector::new(config(tmp.path(), &["gone"], &[], false));
    let tolerant = CollisionDetector::new(config(tmp.path(), &["gone"], &[], true));
    fs::remove_dir_all(tmp.path().join("gone")).unwrap();

    let DetectionError::Parse(parse) = strict.detect().unwrap_err();
    assert!(matches!(parse, ParseError::Walk { .. }));
    assert!(parse.to_string().contains("Unable to list"));

    let result = tolerant.detect().unwrap();
    assert_eq!(result.files_analysed, 0);
    assert_eq!(result.files_excluded, 1);
}

#[test]
fn excluded_paths_are_counted_and_skipped() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/A.php", "<?php class A {}");
    write_file(tmp.path(), "src/vendor/A.php", "<?php class A {}");
    write_file(tmp.path(), "src/vendor/B.php", "<?php class B {}");

    let result = CollisionDetector::new(config(tmp.path(), &["src"], &["src/vendor"], false))
        .detect()
        .unwrap();
    assert_eq!(result.files_analysed, 1);
    assert_eq!(result.files_excluded, 2);
    assert!(result.collisions.is_empty());
}

#[test]
fn only_configured_extensions_are_scanned() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "a.php", "<?php class A {}");
    write_file(tmp.path(), "a.inc", "<?php class A {}");
    write_file(tmp.path(), "a.txt", "<?php class A {}");

    let result = detect(tmp.path(), &["."]);
    assert_eq!(result.files_analysed, 1);

    let cfg = DetectionConfig::new(
        &[tmp.path()],
        &Vec::<PathBuf>::new(),
        &["php".to_string(), ".inc".to_string()],
        tmp.path(),
        false,
    )
    .unwrap();
    let result = CollisionDetector::new(cfg).detect().unwrap();
    assert_eq!(result.files_analysed, 2);
    assert_eq!(
        locations(&result, DeclarationGroup::Type, "A"),
        vec![Location::new("a.inc", 1), Location::new("a.php", 1)]
    );
}

#[test]
fn html_files_and_multiple_files_scenario() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "multiple-files/colliding1.php",
        "<?php\nnamespace {\n    class GlobalClass {}\n    function globalFunction() {}\n    const GLOBAL_CONST = 1;\n}\nnamespace Foo {\n    class NamespacedClass {}\n    function namespacedFunction() {}\n    const NAMESPACED_CONST = 1;\n}\n",
    );
    write_file(
        tmp.path(),
        "multiple-files/colliding2.php",
        "<html>\n<?php\nclass GlobalClass {}\nfunction globalFunction() {}\nconst GLOBAL_CONST = 1;\n?>\n</html>\n",
    );
    write_file(
        tmp.path(),
        "multiple-files/colliding3.php",
        "<?php\nnamespace Foo;\nclass NamespacedClass {}\nfunction namespacedFunction() {}\nconst NAMESPACED_CONST = 1;\n",
    );

    let result = detect(tmp.path(), &["multiple-files"]);
    let names: Vec<_> = result
        .collisions
        .iter()
        .map(|(group, name, locations)| (group, name.to_string(), locations.len()))
        .collect();
    assert_eq!(
        names,
        vec![
            (DeclarationGroup::Type, "Foo\\NamespacedClass".to_string(), 2),
            (DeclarationGroup::Type, "GlobalClass".to_string(), 2),
            (DeclarationGroup::Function, "Foo\\namespacedFunction".to_string(), 2),
            (DeclarationGroup::Function, "globalFunction".to_string(), 2),
            (DeclarationGroup::Constant, "Foo\\NAMESPACED_CONST".to_string(), 2),
            (DeclarationGroup::Constant, "GLOBAL_CONST".to_string(), 2),
        ]
    );
    assert_eq!(
        locations(&result, DeclarationGroup::Type, "GlobalClass"),
        vec![
            Location::new("multiple-files/colliding1.php", 3),
            Location::new("multiple-files/colliding2.php", 3),
        ]
    );
}
