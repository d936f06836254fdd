// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record tree construction
//!
//! OpenFlight stores the scene as a flat record sequence; nesting is
//! expressed with PushLevel/PopLevel records. [`Parser`] rebuilds the tree
//! with one scope loop per node: the node's root handler reads its own
//! ancillary records until a PushLevel switches it to the child handler,
//! which opens child nodes until a PopLevel brings the stream back to the
//! node's level. A record that ends the current node without a PopLevel
//! (a sibling Group, a Face following a Face) is thrown back: the repeat
//! flag is set and the parent re-reads the same header.
//!
//! External references are parsed synchronously into the same graph, log
//! and reference bank. A file is parsed once per import; later references
//! to the same resolved path become aliases.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::dispatch::{is_do_not_report, HandlerAction, HandlerScope, NodeClass, RecordHandler};
use crate::error::{Error, Result};
use crate::graph::{NodeKey, SceneGraph};
use crate::header::Header;
use crate::log::{DiagnosticKind, ImportLog};
use crate::material::MaterialBank;
use crate::opcode::Opcode;
use crate::palette::{
    ColorPalette, MaterialEntry, TextureEntry, Vertex, VertexFormat, VertexPalette,
};
use crate::records::{
    Database, Dof, ExternalReference, Face, Group, Lod, Node, Object, RecordKind, ReferenceRole,
    Switch, Unhandled, VertexList,
};
use crate::resolve::FileResolver;
use crate::settings::ImportSettings;
use crate::stream::{null_terminated, FieldReader, RecordStream};
use crate::xref::ExternalReferenceBank;

/// Result of one record inside a scope loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Keep reading records in this scope
    Continue,
    /// The scope is finished: its PopLevel was read or the stream ended
    EndOfScope,
    /// The record belongs to an ancestor and will be read again
    Repeat,
}

/// Everything the parse pass produced
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub graph: SceneGraph,
    pub root: NodeKey,
    pub log: ImportLog,
    pub references: ExternalReferenceBank,
    /// Material bank of the root database
    pub materials: MaterialBank,
}

/// Parse pass configuration and shared state
#[derive(Debug, Clone)]
pub struct Parser {
    settings: ImportSettings,
    resolver: FileResolver,
    log: ImportLog,
    references: ExternalReferenceBank,
    materials: MaterialBank,
    cancel: CancellationToken,
}

impl Parser {
    pub fn new(settings: ImportSettings) -> Self {
        let resolver = FileResolver::new(settings.additional_search_directories.clone());
        Self {
            settings,
            resolver,
            log: ImportLog::new(),
            references: ExternalReferenceBank::new(),
            materials: MaterialBank::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Share a resolver with other imports
    pub fn with_resolver(mut self, resolver: FileResolver) -> Self {
        for dir in &self.settings.additional_search_directories {
            resolver.add_directory(dir.clone());
        }
        self.resolver = resolver;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_log(mut self, log: ImportLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_references(mut self, references: ExternalReferenceBank) -> Self {
        self.references = references;
        self
    }

    pub fn with_materials(mut self, materials: MaterialBank) -> Self {
        self.materials = materials;
        self
    }

    pub fn log(&self) -> &ImportLog {
        &self.log
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    /// Read and parse the database at `path`
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseOutput> {
        let path = path.as_ref();
        self.cancel.check()?;
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.parse_bytes(path, &data)
    }

    /// Parse an in-memory database; `path` anchors relative references
    pub fn parse_bytes(&self, path: impl Into<PathBuf>, data: &[u8]) -> Result<ParseOutput> {
        let path = path.into();
        let mut session = Session {
            graph: SceneGraph::new(),
            settings: &self.settings,
            resolver: &self.resolver,
            log: &self.log,
            references: &self.references,
            cancel: &self.cancel,
            ancestry: Vec::new(),
        };

        let root = session.parse_database(&path, data, DatabaseLink::root(self.materials.clone()))?;
        session.graph.set_root(root);

        tracing::info!(
            path = %path.display(),
            nodes = session.graph.len(),
            references = self.references.len(),
            "Parsed database"
        );

        Ok(ParseOutput {
            graph: session.graph,
            root,
            log: self.log.clone(),
            references: self.references.clone(),
            materials: self.materials.clone(),
        })
    }
}

/// Parse `path` with default sharing
pub fn parse_file(path: impl AsRef<Path>, settings: &ImportSettings) -> Result<ParseOutput> {
    Parser::new(settings.clone()).parse_file(path)
}

/// How a database hangs off the graph
struct DatabaseLink {
    reference: Option<NodeKey>,
    parent_database: Option<NodeKey>,
    override_flags: i32,
    materials: MaterialBank,
}

impl DatabaseLink {
    fn root(materials: MaterialBank) -> Self {
        Self {
            reference: None,
            parent_database: None,
            override_flags: 0,
            materials,
        }
    }
}

/// State of one parse call
struct Session<'p> {
    graph: SceneGraph,
    settings: &'p ImportSettings,
    resolver: &'p FileResolver,
    log: &'p ImportLog,
    references: &'p ExternalReferenceBank,
    cancel: &'p CancellationToken,
    /// Files of the databases currently being parsed, outermost first
    ancestry: Vec<PathBuf>,
}

impl Session<'_> {
    fn parse_database(&mut self, path: &Path, data: &[u8], link: DatabaseLink) -> Result<NodeKey> {
        self.log.info(
            DiagnosticKind::Progress,
            format!("Loading database {}", path.display()),
        );

        let mut stream = RecordStream::new(data);
        if !stream.begin_record()? || stream.opcode() != Opcode::Header {
            return Err(Error::CorruptHeader(format!(
                "{}: first record is {}, expected a Header",
                path.display(),
                stream.opcode()
            )));
        }
        stream.set_repeat();

        let database = Database {
            path: path.to_path_buf(),
            materials: link.materials,
            referenced_by: link.reference,
            parent_database: link.parent_database,
            override_flags: link.override_flags,
            ..Default::default()
        };
        let node = Node::new(
            Opcode::Header,
            stream.length(),
            0,
            RecordKind::Database(Box::new(database)),
        );
        let key = self.graph.insert(node, link.reference);
        self.graph[key].database = key;

        self.ancestry.push(path.to_path_buf());
        let result = self.parse_scope(&mut stream, key, NodeClass::Database);
        self.ancestry.pop();

        if let Err(err) = result {
            let discarded: Vec<NodeKey> = self.graph.depth_first(key).collect();
            let released = self.references.forget(&discarded);
            if released > 0 {
                tracing::debug!(
                    path = %path.display(),
                    released,
                    "Released references of discarded database"
                );
            }
            self.graph.remove_subtree(key);
            return Err(err);
        }
        if stream.level() != 0 {
            self.log.warn(
                DiagnosticKind::Structural,
                format!(
                    "{}: stream ended with {} unclosed push level(s)",
                    path.display(),
                    stream.level()
                ),
            );
        }
        Ok(key)
    }

    /// Consume records for `key` until its scope ends
    fn parse_scope(
        &mut self,
        stream: &mut RecordStream<'_>,
        key: NodeKey,
        class: NodeClass,
    ) -> Result<ParseOutcome> {
        let start_level = stream.level();
        let mut handler = RecordHandler::root(class);
        let mut suspended: Option<RecordHandler> = None;

        loop {
            self.cancel.check()?;
            if !stream.begin_record()? {
                return Ok(ParseOutcome::EndOfScope);
            }
            let opcode = stream.opcode();

            let outcome = match handler.action(opcode) {
                Some(HandlerAction::Push) => {
                    stream.set_level(stream.level() + 1);
                    handler = RecordHandler::child(class);
                    ParseOutcome::Continue
                }
                Some(HandlerAction::Pop) => {
                    stream.set_level(stream.level() - 1);
                    if stream.level() == start_level {
                        ParseOutcome::EndOfScope
                    } else {
                        ParseOutcome::Continue
                    }
                }
                Some(HandlerAction::PushExtension) => {
                    suspended.get_or_insert(handler);
                    handler = RecordHandler::extension(class);
                    ParseOutcome::Continue
                }
                Some(HandlerAction::PopExtension) => {
                    handler = suspended.take().unwrap_or(RecordHandler::root(class));
                    ParseOutcome::Continue
                }
                Some(action) => {
                    self.apply(stream, key, action)?;
                    ParseOutcome::Continue
                }
                None if handler.throws_back(opcode) => {
                    stream.set_repeat();
                    ParseOutcome::Repeat
                }
                None => {
                    if handler.scope != HandlerScope::Extension && !is_do_not_report(opcode) {
                        self.log.info(
                            DiagnosticKind::UnhandledOpcode,
                            format!(
                                "Unhandled opcode {} in {:?} record at offset {}",
                                opcode,
                                class,
                                stream.offset()
                            ),
                        );
                    }
                    ParseOutcome::Continue
                }
            };

            if outcome != ParseOutcome::Continue {
                return Ok(outcome);
            }
        }
    }

    fn apply(
        &mut self,
        stream: &mut RecordStream<'_>,
        key: NodeKey,
        action: HandlerAction,
    ) -> Result<()> {
        match action {
            HandlerAction::LongId => {
                self.graph[key].id = null_terminated(stream.body());
            }
            HandlerAction::Comment => {
                self.graph[key].comment = Some(null_terminated(stream.body()));
            }
            HandlerAction::Matrix => {
                let body = self.padded(stream, 64);
                let mut reader = FieldReader::new(&body, stream.endianness());
                let mut matrix = [0f32; 16];
                for value in matrix.iter_mut() {
                    *value = reader.f32()?;
                }
                self.graph[key].matrix = Some(matrix);
            }
            HandlerAction::Header => {
                let body = self.padded(stream, Header::LAYOUT_LEN);
                let header = Header::read(&mut FieldReader::new(&body, stream.endianness()))?;
                let node = &mut self.graph[key];
                node.id = header.id.clone();
                if let Some(db) = node.as_database_mut() {
                    db.header = header;
                }
            }
            HandlerAction::ColorPalette => {
                let body = self.padded(stream, ColorPalette::LAYOUT_LEN);
                let palette = ColorPalette::read(&mut FieldReader::new(&body, stream.endianness()))?;
                if let Some(db) = self.database_mut(key) {
                    db.palettes.colors = Some(palette);
                }
            }
            HandlerAction::TexturePalette => {
                let body = self.padded(stream, TextureEntry::LAYOUT_LEN);
                let entry = TextureEntry::read(&mut FieldReader::new(&body, stream.endianness()))?;
                if let Some(db) = self.database_mut(key) {
                    db.palettes.textures.insert(entry.index, entry);
                }
            }
            HandlerAction::MaterialPalette => {
                let body = self.padded(stream, MaterialEntry::LAYOUT_LEN);
                let entry = MaterialEntry::read(&mut FieldReader::new(&body, stream.endianness()))?;
                if let Some(db) = self.database_mut(key) {
                    db.palettes.materials.insert(entry.index, entry);
                }
            }
            HandlerAction::VertexPalette => {
                let palette = self.read_vertex_palette(stream)?;
                if let Some(db) = self.database_mut(key) {
                    db.palettes.vertices = palette;
                }
            }
            HandlerAction::Open(class) => {
                self.open_child(stream, key, class)?;
            }
            HandlerAction::Vertex
            | HandlerAction::Push
            | HandlerAction::Pop
            | HandlerAction::PushExtension
            | HandlerAction::PopExtension => {}
        }
        Ok(())
    }

    /// Vertex palette header followed by vertex records
    fn read_vertex_palette(&mut self, stream: &mut RecordStream<'_>) -> Result<VertexPalette> {
        let body = self.padded(stream, 4);
        let declared = FieldReader::new(&body, stream.endianness()).i32()?;
        let mut palette = VertexPalette::new(declared);
        let handler = RecordHandler::root(NodeClass::VertexPalette);

        loop {
            self.cancel.check()?;
            if !stream.begin_record()? {
                break;
            }
            let opcode = stream.opcode();
            let format = match (handler.action(opcode), VertexFormat::from_opcode(opcode)) {
                (Some(HandlerAction::Vertex), Some(format)) => format,
                _ => {
                    // everything else ends the palette
                    stream.set_repeat();
                    break;
                }
            };
            let body = self.padded(stream, Vertex::layout_len(format));
            let vertex = Vertex::read(format, &mut FieldReader::new(&body, stream.endianness()))?;
            palette.push(vertex, stream.length());
        }

        tracing::debug!(vertices = palette.len(), "Read vertex palette");
        Ok(palette)
    }

    fn open_child(
        &mut self,
        stream: &mut RecordStream<'_>,
        parent: NodeKey,
        class: NodeClass,
    ) -> Result<()> {
        let opcode = stream.opcode();
        let endianness = stream.endianness();
        let database = self.graph[parent].database;

        let (id, kind) = match class {
            NodeClass::Group => {
                let body = self.padded(stream, Group::LAYOUT_LEN);
                let (id, group) = Group::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Group(group))
            }
            NodeClass::Object => {
                let body = self.padded(stream, Object::LAYOUT_LEN);
                let (id, object) = Object::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Object(object))
            }
            NodeClass::Lod => {
                let body = self.padded(stream, Lod::LAYOUT_LEN);
                let (id, lod) = Lod::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Lod(lod))
            }
            NodeClass::Switch => {
                let body = self.padded(stream, Switch::LAYOUT_LEN);
                let (id, switch) = Switch::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Switch(switch))
            }
            NodeClass::Dof => {
                let body = self.padded(stream, Dof::LAYOUT_LEN);
                let (id, dof) = Dof::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Dof(Box::new(dof)))
            }
            NodeClass::Face => {
                let body = self.padded(stream, Face::LAYOUT_LEN);
                let (id, face) = Face::read(&mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Face(Box::new(face)))
            }
            NodeClass::ExternalReference => {
                let body = self.padded(stream, ExternalReference::LAYOUT_LEN);
                let xref = ExternalReference::read(&mut FieldReader::new(&body, endianness))?;
                (String::new(), RecordKind::ExternalReference(xref))
            }
            NodeClass::VertexList => {
                let list = match self.graph[database].as_database() {
                    Some(db) => {
                        VertexList::read(&mut stream.fields(), &db.palettes.vertices, self.log)?
                    }
                    None => VertexList::default(),
                };
                (String::new(), RecordKind::VertexList(list))
            }
            NodeClass::Unhandled => {
                let body = self.padded(stream, Unhandled::LAYOUT_LEN);
                let (id, record) = Unhandled::read(opcode, &mut FieldReader::new(&body, endianness))?;
                (id, RecordKind::Unhandled(record))
            }
            NodeClass::Database | NodeClass::VertexPalette => return Ok(()),
        };

        let mut node = Node::new(opcode, stream.length(), stream.level(), kind);
        node.id = id;
        node.database = database;
        let key = self.graph.insert(node, Some(parent));

        match class {
            // vertex lists have no scope of their own
            NodeClass::VertexList => return Ok(()),
            NodeClass::ExternalReference => self.load_reference(key)?,
            _ => {}
        }

        // the child's outcome never ends the parent's scope
        self.parse_scope(stream, key, class)?;
        Ok(())
    }

    /// Resolve, deduplicate and parse the target of reference node `key`
    fn load_reference(&mut self, key: NodeKey) -> Result<()> {
        let database = self.graph[key].database;
        let (directory, parent_materials) = match self.graph[database].as_database() {
            Some(db) => (db.directory().map(Path::to_path_buf), db.materials.clone()),
            None => (None, MaterialBank::new()),
        };
        let Some(xref) = self.graph[key].as_reference().cloned() else {
            return Ok(());
        };

        let (role, resolved, sub_database) =
            self.resolve_reference(key, &xref, directory.as_deref(), database, parent_materials)?;

        if let Some(target) = self.graph[key].as_reference_mut() {
            target.role = role;
            target.resolved = resolved;
            if let Some(sub) = sub_database {
                target.database = sub;
            }
        }
        let node = &mut self.graph[key];
        if let Some(id) = node.as_reference().map(ExternalReference::display_id) {
            node.id = id;
        }
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        key: NodeKey,
        xref: &ExternalReference,
        directory: Option<&Path>,
        database: NodeKey,
        parent_materials: MaterialBank,
    ) -> Result<(ReferenceRole, Option<PathBuf>, Option<NodeKey>)> {
        if !self.settings.follow_external_references {
            return Ok((ReferenceRole::Skipped, None, None));
        }

        let Some(path) = self.resolver.find(&xref.path, directory) else {
            self.log.error(
                DiagnosticKind::BrokenReference,
                format!("Could not find external reference: {}", xref.path),
            );
            return Ok((ReferenceRole::Broken, None, None));
        };

        if self.ancestry.contains(&path) {
            self.log.error(
                DiagnosticKind::BrokenReference,
                Error::CyclicReference(path.clone()).to_string(),
            );
            return Ok((ReferenceRole::Broken, Some(path), None));
        }

        let owner = self.references.claim(path.clone(), key);
        if owner != key {
            return Ok((ReferenceRole::Alias { owner }, Some(path), None));
        }

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                self.log.error(
                    DiagnosticKind::BrokenReference,
                    Error::io(&path, err).to_string(),
                );
                return Ok((ReferenceRole::Broken, Some(path), None));
            }
        };

        let materials = if xref.shares_material_bank() {
            parent_materials
        } else {
            MaterialBank::new()
        };
        let link = DatabaseLink {
            reference: Some(key),
            parent_database: Some(database),
            override_flags: xref.flags,
            materials,
        };

        match self.parse_database(&path, &data, link) {
            Ok(sub) => Ok((ReferenceRole::Owner, Some(path), Some(sub))),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                self.log.error(
                    DiagnosticKind::BrokenReference,
                    format!("Failed to load external reference {}: {}", xref.path, err),
                );
                Ok((ReferenceRole::Broken, Some(path), None))
            }
        }
    }

    /// Record body padded to `layout_len`, logging short records
    fn padded<'a>(&self, stream: &RecordStream<'a>, layout_len: usize) -> Cow<'a, [u8]> {
        if stream.is_short(layout_len) {
            self.log.warn(
                DiagnosticKind::ShortRecord,
                format!(
                    "{} record at offset {} has {} field bytes, expected {}; missing fields read as zero",
                    stream.opcode(),
                    stream.offset(),
                    stream.body().len(),
                    layout_len
                ),
            );
        }
        stream.padded_body(layout_len)
    }

    fn database_mut(&mut self, key: NodeKey) -> Option<&mut Database> {
        self.graph.get_mut(key).and_then(Node::as_database_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FltWriter;

    fn parse(data: &[u8]) -> ParseOutput {
        Parser::new(ImportSettings::default())
            .parse_bytes("memory.flt", data)
            .unwrap()
    }

    #[test]
    fn test_missing_header() {
        let mut w = FltWriter::new();
        w.push();
        let err = Parser::new(ImportSettings::default())
            .parse_bytes("bad.flt", &w.finish())
            .unwrap_err();
        assert!(matches!(err, Error::CorruptHeader(_)));
    }

    #[test]
    fn test_empty_input() {
        let err = Parser::new(ImportSettings::default())
            .parse_bytes("empty.flt", &[])
            .unwrap_err();
        assert!(matches!(err, Error::CorruptHeader(_)));
    }

    #[test]
    fn test_group_levels() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.group("g1");
        w.push();
        w.group("g2");
        w.pop();
        w.pop();
        let out = parse(&w.finish());

        let groups = out.graph.find_by_opcode(Opcode::Group);
        assert_eq!(groups.len(), 2);
        assert_eq!(out.graph[groups[0]].level, 1);
        assert_eq!(out.graph[groups[1]].level, 2);
        assert_eq!(out.graph.parent(groups[1]), Some(groups[0]));
        assert!(!out.log.has_problems());
    }

    #[test]
    fn test_long_id_and_comment() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.group("g1");
        w.long_id("a_much_longer_group_name");
        w.comment("placed by hand");
        w.pop();
        let out = parse(&w.finish());

        let group = out.graph.find_by_opcode(Opcode::Group)[0];
        assert_eq!(out.graph[group].id, "a_much_longer_group_name");
        assert_eq!(out.graph[group].comment.as_deref(), Some("placed by hand"));
    }

    #[test]
    fn test_extension_records_are_skipped() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.group("g1");
        w.push_extension();
        w.group("hidden");
        w.pop_extension();
        w.pop();
        let out = parse(&w.finish());
        assert_eq!(out.graph.find_by_opcode(Opcode::Group).len(), 1);
    }

    #[test]
    fn test_unhandled_opcode_reported_once() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.record(Opcode::Mesh, &[0u8; 8]);
        w.record(Opcode::Comment, b"db comment\0");
        w.pop();
        let out = parse(&w.finish());
        let unhandled: Vec<_> = out
            .log
            .entries()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::UnhandledOpcode)
            .collect();
        assert_eq!(unhandled.len(), 1);
        assert!(unhandled[0].message.contains("Mesh(84)"));
    }

    #[test]
    fn test_short_group_is_padded() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.record(Opcode::Group, b"short\0\0\0");
        w.pop();
        let out = parse(&w.finish());
        let group = out.graph.find_by_opcode(Opcode::Group)[0];
        assert_eq!(out.graph[group].id, "short");
        assert_eq!(out.log.count(crate::log::Severity::Warning), 1);
    }

    #[test]
    fn test_matrix_is_kept() {
        let mut w = FltWriter::new();
        w.header("db");
        w.push();
        w.group("g");
        let mut m = [0f32; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        m[12] = 5.0;
        w.matrix(&m);
        w.pop();
        let out = parse(&w.finish());
        let group = out.graph.find_by_opcode(Opcode::Group)[0];
        assert_eq!(out.graph[group].matrix, Some(m));
    }
}
