//! End-to-end runs of the post-processing stages over fixture reports laid out the way
//! `qualtrack run` leaves them.

use pretty_assertions::assert_eq;
use qualtrack::commands::{self, Context};
use qualtrack::layout::OutputLayout;
use qualtrack::{PipelineConfig, RevisionSequence};
use std::fs;
use std::path::Path;

fn bug(class: &str, bug_type: &str, category: &str) -> String {
    let file = class.rsplit('.').next().unwrap_or(class);
    let path = class.replace('.', "/");
    format!(
        r#"  <BugInstance type="{bug_type}" priority="2" category="{category}">
    <Class classname="{class}"/>
    <SourceLine classname="{class}" start="1" end="2" sourcefile="{file}.java" sourcepath="{path}.java"/>
  </BugInstance>
"#
    )
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn refactoring(kind: &str, files: &[&str]) -> String {
    let locations: Vec<String> = files
        .iter()
        .map(|f| format!(r#"{{"filePath":"src/main/java/{f}"}}"#))
        .collect();
    format!(
        r#"{{"type":"{kind}","description":"{kind}","leftSideLocations":[{}],"rightSideLocations":[{}]}}"#,
        locations.join(","),
        locations.join(",")
    )
}

/// Revisions v5.3 and v5.4 with defects, one refactoring report and CK tables.
fn fixture(root: &Path) -> Context {
    let config = PipelineConfig {
        output_root: root.to_path_buf(),
        metrics: vec!["loc".to_string(), "wmc".to_string()],
        ..PipelineConfig::default()
    };
    let revisions = RevisionSequence::from_ordered_tags(["v5.3", "v5.4"]);
    let layout = OutputLayout::new(root);
    let revs: Vec<_> = revisions.iter().cloned().collect();

    let mut v53 = String::from("<BugCollection>\n");
    for _ in 0..3 {
        v53.push_str(&bug("a.b.Foo", "SE_BAD_FIELD", "BAD_PRACTICE"));
    }
    v53.push_str(&bug("a.b.Bar", "EI_EXPOSE_REP", "MALICIOUS_CODE"));
    v53.push_str(&bug("a.b.Bar", "X_EXPERIMENT", "EXPERIMENTAL"));
    v53.push_str("</BugCollection>\n");
    write(&layout.defect_report(&revs[0]), &v53);

    let mut v54 = String::from("<BugCollection>\n");
    v54.push_str(&bug("a.b.Foo", "SE_BAD_FIELD", "BAD_PRACTICE"));
    v54.push_str(&bug("a.b.Foo$Inner", "DM_DEFAULT_ENCODING", "I18N"));
    v54.push_str("</BugCollection>\n");
    write(&layout.defect_report(&revs[1]), &v54);

    let events = [
        refactoring("Extract Method", &["a/b/Foo.java", "a/b/Bar.java"]),
        refactoring("Rename Method", &["a/b/Foo.java"]),
        refactoring("Rename Method", &["a/b/Foo.java"]),
        refactoring("Move Class", &["a/b/Foo.java"]),
    ];
    write(
        &layout.refactoring_report(&revs[0], &revs[1]),
        &format!(
            r#"{{"commits":[{{"sha1":"c1","refactorings":[{}]}}]}}"#,
            events.join(",")
        ),
    );

    write(
        &layout.metrics_dir(&revs[0]).join("ck_metrics.csvclass.csv"),
        "file,class,type,loc,wmc\nFoo.java,a.b.Foo,class,2,1\nBar.java,a.b.Bar,class,4,3\nI.java,a.b.I,interface,100,0\n",
    );
    write(
        &layout.metrics_dir(&revs[1]).join("ck_metrics.csvclass.csv"),
        "file,class,type,loc,wmc\nFoo.java,a.b.Foo,class,2,1\nBar.java,a.b.Bar,class,4,4\nBaz.java,a.b.Baz,class,7,4\nEnum.java,a.b.E,enum,5,5\n",
    );

    Context::new(config, revisions)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

#[test]
fn interval_merge_keeps_only_classes_seen_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());

    commands::normalize(&ctx).unwrap();
    let counts = read(&dir.path().join("normalized/refactoring_v5.3_to_v5.4_count.csv"));
    assert_eq!(counts, "class,qtd_refactorings\na.b.Foo,4\na.b.Bar,1\n");

    let outcome = commands::merge(&ctx).unwrap();
    let merged = read(&dir.path().join("merged/merged_refactorings_spotbugs_5.3_to_5.4.csv"));
    assert_eq!(merged, "class,qtd_refactorings,bugs_5.3,bugs_5.4\na.b.Foo,4,3,2\n");
    assert!(outcome.written.iter().any(|p| p.ends_with("ck_refactorings_5.4.csv")));
}

#[test]
fn revision_merge_joins_metrics_refactorings_and_defects() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::normalize(&ctx).unwrap();
    let outcome = commands::merge(&ctx).unwrap();

    let ck_rf = read(&dir.path().join("merged/ck_refactorings_5.4.csv"));
    assert_eq!(
        ck_rf,
        "class,refactoring_count,refactorings\n\
         a.b.Bar,1,Extract Method\n\
         a.b.Foo,4,Extract Method;Move Class;Rename Method\n"
    );
    let full = read(&dir.path().join("merged/ck_refactorings_spotbugs_5.4.csv"));
    assert_eq!(
        full,
        "class,refactoring_count,refactorings,bug_count,bug_types\n\
         a.b.Foo,4,Extract Method;Move Class;Rename Method,2,DM_DEFAULT_ENCODING;SE_BAD_FIELD\n"
    );

    // v5.3 has no incoming interval, so its per-revision merge is skipped, not fatal
    assert!(outcome.skipped.iter().any(|u| u.contains("v5.3")));
}

#[test]
fn missing_defect_report_skips_only_that_revision() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    fs::remove_file(ctx.layout.defect_report(ctx.revisions.iter().next().unwrap())).unwrap();

    let outcome = commands::normalize(&ctx).unwrap();
    assert_eq!(outcome.skipped, vec!["defects v5.3".to_string()]);
    assert!(dir.path().join("normalized/spotbugs_5.4.csv").is_file());

    // the interval needs both endpoints, so it is skipped during merge
    let merged = commands::merge(&ctx).unwrap();
    assert!(merged.skipped.iter().any(|u| u.starts_with("interval")));
}

#[test]
fn trend_series_written_in_revision_order() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::trend(&ctx).unwrap();

    let all = read(&dir.path().join("trend/ck_summary_metrics_all_releases.csv"));
    assert_eq!(
        all,
        "release,loc_mean,loc_median,loc_var,wmc_mean,wmc_median,wmc_var\n\
         v5.3,3,3,1,2,2,1\n\
         v5.4,4.3333,4,4.2222,3,4,2\n"
    );
    assert!(dir.path().join("trend/ck_summary_metrics_v5.3.csv").is_file());
}

#[test]
fn stats_exclude_experimental_and_follow_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::stats(&ctx).unwrap();

    let categories: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("stats/spotbugs_category_counts.json")))
            .unwrap();
    assert_eq!(categories[0]["label"], "5.3");
    assert_eq!(categories[0]["total"], 4);
    assert!(categories[0]["counts"].get("EXPERIMENTAL").is_none());
    assert_eq!(categories[1]["label"], "5.4");

    let malicious: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("stats/malicious_code_type_counts.json")))
            .unwrap();
    assert_eq!(malicious[0]["counts"]["EI_EXPOSE_REP"], 1);

    let refactorings: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("stats/refactoring_counts.json"))).unwrap();
    assert_eq!(refactorings[0]["label"], "v5.3_to_v5.4");
    assert_eq!(refactorings[0]["total"], 4);
    assert_eq!(refactorings[0]["counts"]["Rename Method"], 2);
}

#[test]
fn schema_error_in_one_table_skips_the_unit() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::normalize(&ctx).unwrap();
    write(
        &dir.path().join("normalized/refactoring_v5.3_to_v5.4_count.csv"),
        "klass,qtd_refactorings\na.b.Foo,4\n",
    );
    let outcome = commands::merge(&ctx).unwrap();
    assert!(outcome.skipped.iter().any(|u| u == "interval v5.3_to_v5.4"));
    assert!(!dir
        .path()
        .join("merged/merged_refactorings_spotbugs_5.3_to_5.4.csv")
        .exists());
}

#[test]
fn category_stats_count_bugs_without_a_location() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    let v53 = ctx.revisions.iter().next().unwrap();
    write(
        &ctx.layout.defect_report(v53),
        r#"<BugCollection>
  <BugInstance type="SE_BAD_FIELD" priority="2" category="STYLE">
    <Class classname="a.b.Foo"/>
    <SourceLine classname="a.b.Foo" start="1" end="2" sourcefile="Foo.java" sourcepath="a/b/Foo.java"/>
  </BugInstance>
  <BugInstance type="UWF_UNWRITTEN_FIELD" priority="3" category="STYLE">
    <Class classname="a.b.Foo"/>
  </BugInstance>
  <BugInstance type="MS_MUTABLE_ARRAY" priority="2" category="MALICIOUS_CODE"/>
</BugCollection>
"#,
    );

    commands::stats(&ctx).unwrap();
    let categories: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("stats/spotbugs_category_counts.json")))
            .unwrap();
    assert_eq!(categories[0]["total"], 3);
    assert_eq!(categories[0]["counts"]["STYLE"], 2);
    let malicious: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("stats/malicious_code_type_counts.json")))
            .unwrap();
    assert_eq!(malicious[0]["counts"]["MS_MUTABLE_ARRAY"], 1);

    // the per-class table still only holds the located finding
    commands::normalize(&ctx).unwrap();
    let normalized = read(&dir.path().join("normalized/spotbugs_5.3.csv"));
    assert_eq!(normalized.lines().count(), 2);
}

#[test]
fn truncated_report_skips_its_revision_only() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    let v53 = ctx.revisions.iter().next().unwrap();
    write(
        &ctx.layout.defect_report(v53),
        "<BugCollection>\n  <BugInstance type=\"X\" category=\"STYLE\">\n    <Class classname=\"a.b.Foo\"/>\n",
    );

    let outcome = commands::normalize(&ctx).unwrap();
    assert_eq!(outcome.skipped, vec!["defects v5.3".to_string()]);
    assert!(dir.path().join("normalized/spotbugs_5.4.csv").is_file());

    let stats = commands::stats(&ctx).unwrap();
    assert!(stats.skipped.contains(&"defects v5.3".to_string()));
}

#[test]
fn non_numeric_tags_still_merge_their_interval() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        output_root: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    };
    let revisions = RevisionSequence::from_ordered_tags(["r1", "r2"]);
    let layout = OutputLayout::new(dir.path());
    let revs: Vec<_> = revisions.iter().cloned().collect();
    let report = |class: &str| format!("<BugCollection>\n{}</BugCollection>\n", bug(class, "T", "STYLE"));
    write(&layout.defect_report(&revs[0]), &report("a.b.Foo"));
    write(&layout.defect_report(&revs[1]), &report("a.b.Foo"));
    write(
        &layout.refactoring_report(&revs[0], &revs[1]),
        &format!(r#"[{{"sha1":"c","refactorings":[{}]}}]"#, refactoring("Move Class", &["a/b/Foo.java"])),
    );
    let ctx = Context::new(config, revisions);

    commands::normalize(&ctx).unwrap();
    let outcome = commands::merge(&ctx).unwrap();
    let merged = read(&dir.path().join("merged/merged_refactorings_spotbugs_r1_to_r2.csv"));
    assert_eq!(merged, "class,qtd_refactorings,bugs_r1,bugs_r2\na.b.Foo,1,1,1\n");
    assert!(!outcome.skipped.iter().any(|u| u.starts_with("interval")));
}

#[test]
fn missing_interval_counts_are_reported_as_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::normalize(&ctx).unwrap();
    fs::remove_file(dir.path().join("normalized/refactoring_v5.3_to_v5.4_count.csv")).unwrap();

    let outcome = commands::merge(&ctx).unwrap();
    assert!(outcome.skipped.iter().any(|u| u == "interval v5.3_to_v5.4"));
}

#[test]
fn short_interval_spelling_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = fixture(dir.path());
    commands::normalize(&ctx).unwrap();
    fs::rename(
        dir.path().join("normalized/refactoring_v5.3_to_v5.4_count.csv"),
        dir.path().join("normalized/refactoring_v5.3_to_5.4_count.csv"),
    )
    .unwrap();

    commands::merge(&ctx).unwrap();
    let merged = read(&dir.path().join("merged/merged_refactorings_spotbugs_5.3_to_5.4.csv"));
    assert_eq!(merged, "class,qtd_refactorings,bugs_5.3,bugs_5.4\na.b.Foo,4,3,2\n");
}
