// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External reference resolution against files on disk

use std::path::Path;

use flt_lite_core::{
    DiagnosticKind, ExternalReference, FltWriter, ImportSettings, Opcode, Parser, ReferenceRole,
};

fn write_leaf(dir: &Path, name: &str) {
    let mut w = FltWriter::new();
    w.header("leaf");
    w.push();
    w.group("trunk");
    w.pop();
    w.write_to(dir.join(name)).unwrap();
}

fn write_referencing(dir: &Path, name: &str, targets: &[(&str, i32)]) {
    let mut w = FltWriter::new();
    w.header("main");
    w.push();
    for (target, flags) in targets {
        w.external_reference(target, *flags);
    }
    w.pop();
    w.write_to(dir.join(name)).unwrap();
}

fn roles(out: &flt_lite_core::ParseOutput) -> Vec<ReferenceRole> {
    out.graph
        .find_by_opcode(Opcode::ExternalReference)
        .into_iter()
        .filter_map(|k| out.graph[k].as_reference().map(|x| x.role))
        .collect()
}

#[test]
fn test_three_references_one_owner() {
    let dir = tempfile::tempdir().unwrap();
    write_leaf(dir.path(), "tree.flt");
    write_referencing(
        dir.path(),
        "forest.flt",
        &[("tree.flt", 0), ("tree.flt", 0), ("tree.flt", 0)],
    );

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("forest.flt"))
        .unwrap();

    let refs = out.graph.find_by_opcode(Opcode::ExternalReference);
    assert_eq!(refs.len(), 3);
    let owner = refs[0];
    assert_eq!(
        roles(&out),
        [
            ReferenceRole::Owner,
            ReferenceRole::Alias { owner },
            ReferenceRole::Alias { owner },
        ]
    );
    // the leaf was parsed exactly once
    assert_eq!(out.graph.databases().len(), 2);
    assert_eq!(out.graph.find_by_opcode(Opcode::Group).len(), 1);
    assert_eq!(out.references.len(), 1);
    assert_eq!(out.graph[owner].id, "Ref: tree.flt");

    let sub = out.graph[owner].as_reference().unwrap().database;
    let sub_db = out.graph[sub].as_database().unwrap();
    assert_eq!(sub_db.referenced_by, Some(owner));
    assert!(!sub_db.materials.shares_with(&out.materials));
    assert!(!out.log.has_problems(), "{}", out.log);
}

#[test]
fn test_material_override_shares_bank() {
    let dir = tempfile::tempdir().unwrap();
    write_leaf(dir.path(), "tree.flt");
    write_referencing(
        dir.path(),
        "main.flt",
        &[("tree.flt", ExternalReference::FLAG_MATERIAL_PALETTE_OVERRIDE)],
    );

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("main.flt"))
        .unwrap();
    let xref = out.graph.find_by_opcode(Opcode::ExternalReference)[0];
    let sub = out.graph[xref].as_reference().unwrap().database;
    let sub_db = out.graph[sub].as_database().unwrap();
    assert!(sub_db.materials.shares_with(&out.materials));
    assert!(sub_db.overrides_materials());
}

#[test]
fn test_self_reference_is_reported_not_recursed() {
    let dir = tempfile::tempdir().unwrap();
    write_referencing(dir.path(), "loop.flt", &[("loop.flt", 0)]);

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("loop.flt"))
        .unwrap();
    assert_eq!(roles(&out), [ReferenceRole::Broken]);
    assert_eq!(out.graph.databases().len(), 1);
    assert!(out
        .log
        .problems()
        .iter()
        .any(|d| d.kind == DiagnosticKind::BrokenReference && d.message.contains("Cyclic")));
}

#[test]
fn test_indirect_cycle_is_broken_once() {
    let dir = tempfile::tempdir().unwrap();
    write_referencing(dir.path(), "a.flt", &[("b.flt", 0)]);
    write_referencing(dir.path(), "b.flt", &[("a.flt", 0)]);

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("a.flt"))
        .unwrap();
    assert_eq!(roles(&out), [ReferenceRole::Owner, ReferenceRole::Broken]);
    assert_eq!(out.graph.databases().len(), 2);
}

#[test]
fn test_missing_reference_is_broken() {
    let dir = tempfile::tempdir().unwrap();
    write_referencing(dir.path(), "main.flt", &[("nowhere/ghost.flt", 0)]);

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("main.flt"))
        .unwrap();
    let xref = out.graph.find_by_opcode(Opcode::ExternalReference)[0];
    assert_eq!(out.graph[xref].id, "Broken Ref: nowhere/ghost.flt");
    assert_eq!(roles(&out), [ReferenceRole::Broken]);
    assert_eq!(out.log.problems().len(), 1);
}

#[test]
fn test_failed_sub_database_releases_its_references() {
    let dir = tempfile::tempdir().unwrap();
    write_leaf(dir.path(), "b.flt");

    // a.flt claims b.flt, then breaks on a truncated record
    let mut w = FltWriter::new();
    w.header("a");
    w.push();
    w.external_reference("b.flt", 0);
    let mut bytes = w.finish();
    bytes.extend_from_slice(&[0, 2, 0, 40]);
    std::fs::write(dir.path().join("a.flt"), bytes).unwrap();

    write_referencing(dir.path(), "main.flt", &[("a.flt", 0), ("b.flt", 0)]);

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("main.flt"))
        .unwrap();

    let refs = out.graph.find_by_opcode(Opcode::ExternalReference);
    assert_eq!(refs.len(), 2);
    assert_eq!(roles(&out), [ReferenceRole::Broken, ReferenceRole::Owner]);
    assert_eq!(out.graph.databases().len(), 2);
    assert_eq!(out.graph.find_by_opcode(Opcode::Group).len(), 1);

    let owners = out.references.owners();
    assert_eq!(owners.len(), 2);
    assert!(owners.iter().all(|(_, key)| out.graph.get(*key).is_some()));
    assert_eq!(owners[1].1, refs[1]);
}

#[test]
fn test_corrupt_reference_does_not_fail_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("junk.flt"), [0u8, 10, 0, 4]).unwrap();
    write_referencing(dir.path(), "main.flt", &[("junk.flt", 0)]);

    let out = Parser::new(ImportSettings::default())
        .parse_file(dir.path().join("main.flt"))
        .unwrap();
    assert_eq!(roles(&out), [ReferenceRole::Broken]);
    assert_eq!(out.graph.databases().len(), 1);
}

#[test]
fn test_search_directories_find_moved_files() {
    let models = tempfile::tempdir().unwrap();
    let library = tempfile::tempdir().unwrap();
    write_leaf(library.path(), "tree.flt");
    write_referencing(models.path(), "main.flt", &[("C:\\old\\library\\tree.flt", 0)]);

    let settings = ImportSettings::default().with_search_directory(library.path());
    let out = Parser::new(settings)
        .parse_file(models.path().join("main.flt"))
        .unwrap();
    assert_eq!(roles(&out), [ReferenceRole::Owner]);
}

#[test]
fn test_following_disabled_skips_targets() {
    let dir = tempfile::tempdir().unwrap();
    write_leaf(dir.path(), "tree.flt");
    write_referencing(dir.path(), "main.flt", &[("tree.flt", 0)]);

    let out = Parser::new(ImportSettings::default().without_references())
        .parse_file(dir.path().join("main.flt"))
        .unwrap();
    assert_eq!(roles(&out), [ReferenceRole::Skipped]);
    assert_eq!(out.graph.databases().len(), 1);
    assert!(out.references.is_empty());
}
