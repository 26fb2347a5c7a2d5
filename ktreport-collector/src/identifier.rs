// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-side test identifiers, and the report IDs derived from them.
//!
//! Test engines identify each node in their test tree with an ordered list of `(type, value)`
//! segments, for example:
//!
//! ```text
//! [engine:junit-jupiter]/[class:com.example.CalculatorTest]/[method:add()]
//! ```
//!
//! Two IDs are derived from that list:
//!
//! * a [`UniqueId`], which identifies the invocation. It leaves out the engine segment, so the
//!   example above becomes `com.example.CalculatorTest/add()`.
//! * a [`SpecId`], which groups invocations under their enclosing specification. It additionally
//!   leaves out method, test and template segments, so the example becomes
//!   `com.example.CalculatorTest`.

use crate::errors::EngineIdParseError;
use itertools::Itertools;
use ktreport_metadata::{SpecId, TestIdentifierInfo, TestType, UniqueId};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Segment types that are left out of a [`UniqueId`].
static UNIQUE_ID_EXCLUDED_TYPES: &[&str] = &["engine"];

/// Segment types that are left out of a [`SpecId`].
static SPEC_ID_EXCLUDED_TYPES: &[&str] = &[
    "test",
    "engine",
    "method",
    "test-template",
    "test-template-invocation",
];

/// Derives the [`UniqueId`] for a list of segments.
///
/// Segments whose type is `engine` (compared case-insensitively) are dropped, and the remaining
/// values are joined with `/`.
pub fn unique_id_from_segments(segments: &[IdSegment]) -> UniqueId {
    UniqueId::new(join_segments(segments, UNIQUE_ID_EXCLUDED_TYPES))
}

/// Derives the [`SpecId`] for a list of segments.
///
/// Segments whose type is one of `test`, `engine`, `method`, `test-template` or
/// `test-template-invocation` (compared case-insensitively) are dropped, and the remaining values
/// are joined with `/`.
pub fn spec_id_from_segments(segments: &[IdSegment]) -> SpecId {
    SpecId::new(join_segments(segments, SPEC_ID_EXCLUDED_TYPES))
}

fn join_segments(segments: &[IdSegment], excluded_types: &[&str]) -> String {
    segments
        .iter()
        .filter(|segment| {
            let kind = segment.kind.to_lowercase();
            !excluded_types.contains(&kind.as_str())
        })
        .map(|segment| segment.value.as_str())
        .join("/")
}

/// A single `(type, value)` segment of an [`EngineId`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct IdSegment {
    kind: String,
    value: String,
}

impl IdSegment {
    /// Creates a new segment.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Returns the type of this segment, e.g. `class` or `method`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the value of this segment.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// The engine-native, hierarchical identifier of a node in the test tree.
///
/// The text form (used by [`Display`](fmt::Display) and [`FromStr`]) is the one used by the
/// JUnit Platform: `[type:value]` segments joined by `/`, with `%`, `/`, `:`, `[` and `]`
/// percent-encoded inside types and values.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EngineId {
    segments: Vec<IdSegment>,
}

impl EngineId {
    /// Creates a new identifier from the given segments.
    pub fn new(segments: impl IntoIterator<Item = IdSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Creates the root identifier for an engine.
    pub fn for_engine(engine: impl Into<String>) -> Self {
        Self::new([IdSegment::new("engine", engine)])
    }

    /// Returns a new identifier with a segment appended to this one.
    pub fn append(&self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(IdSegment::new(kind, value));
        Self { segments }
    }

    /// Returns the segments that make up this identifier.
    pub fn segments(&self) -> &[IdSegment] {
        &self.segments
    }

    /// Derives the [`UniqueId`] for this identifier.
    pub fn unique_id(&self) -> UniqueId {
        unique_id_from_segments(&self.segments)
    }

    /// Derives the [`SpecId`] for this identifier.
    pub fn spec_id(&self) -> SpecId {
        spec_id_from_segments(&self.segments)
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(
                f,
                "[{}:{}]",
                encode_component(&segment.kind),
                encode_component(&segment.value)
            )?;
        }
        Ok(())
    }
}

impl FromStr for EngineId {
    type Err = EngineIdParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(EngineIdParseError::new(input, "identifier is empty"));
        }

        let mut segments = Vec::new();
        for part in input.split('/') {
            let inner = part
                .strip_prefix('[')
                .and_then(|part| part.strip_suffix(']'))
                .ok_or_else(|| {
                    EngineIdParseError::new(input, "segments must be of the form `[type:value]`")
                })?;
            let (kind, value) = inner.split_once(':').ok_or_else(|| {
                EngineIdParseError::new(input, "segment is missing a `:` separator")
            })?;
            if kind.is_empty() {
                return Err(EngineIdParseError::new(input, "segment type is empty"));
            }
            segments.push(IdSegment::new(
                decode_component(kind).ok_or_else(|| {
                    EngineIdParseError::new(input, "invalid percent-encoding in segment type")
                })?,
                decode_component(value).ok_or_else(|| {
                    EngineIdParseError::new(input, "invalid percent-encoding in segment value")
                })?,
            ));
        }

        Ok(Self { segments })
    }
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            ':' => out.push_str("%3A"),
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            c => out.push(c),
        }
    }
    out
}

fn decode_component(s: &str) -> Option<String> {
    if !s.contains('%') {
        return Some(s.to_owned());
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            // from_str_radix accepts a leading sign, so check the digits first.
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Where a test was defined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestSource {
    /// A class.
    Class {
        /// The fully qualified class name.
        class_name: String,
    },

    /// A method within a class.
    Method {
        /// The fully qualified name of the class containing the method.
        class_name: String,
        /// The method name.
        method_name: String,
        /// The method's parameter types, comma-separated.
        method_parameter_types: String,
    },

    /// A package.
    Package {
        /// The package name.
        package_name: String,
    },

    /// A file or other resource identified by a URI.
    Uri {
        /// The URI.
        uri: String,
    },

    /// Several sources at once.
    Composite(Vec<TestSource>),

    /// Some other kind of source, described by free-form text.
    Other {
        /// A description of the source.
        description: String,
    },
}

impl TestSource {
    /// Returns a short name for this source, as stored in the report's `testSourceName`.
    pub fn name(&self) -> &str {
        match self {
            Self::Class { class_name } => class_name,
            Self::Method { method_name, .. } => method_name,
            Self::Package { package_name } => package_name,
            Self::Uri { uri } => uri,
            Self::Composite(_) | Self::Other { .. } => "Unknown",
        }
    }

    /// Returns a full description of this source, as stored in the report's `testSourceFull`.
    pub fn full(&self) -> String {
        match self {
            Self::Composite(sources) => format!("{} sources composite", sources.len()),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { class_name } => write!(f, "ClassSource [className = '{class_name}']"),
            Self::Method {
                class_name,
                method_name,
                method_parameter_types,
            } => write!(
                f,
                "MethodSource [className = '{class_name}', methodName = '{method_name}', \
                 methodParameterTypes = '{method_parameter_types}']"
            ),
            Self::Package { package_name } => {
                write!(f, "PackageSource [packageName = '{package_name}']")
            }
            Self::Uri { uri } => write!(f, "UriSource [uri = '{uri}']"),
            Self::Composite(sources) => {
                write!(f, "CompositeTestSource [sources = [")?;
                for (i, source) in sources.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{source}")?;
                }
                f.write_str("]]")
            }
            Self::Other { description } => f.write_str(description),
        }
    }
}

/// A node in the engine's test tree, as passed to lifecycle callbacks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestIdentifier {
    id: EngineId,
    display_name: String,
    test_type: TestType,
    tags: BTreeSet<String>,
    source: Option<TestSource>,
}

impl TestIdentifier {
    /// Creates a new identifier.
    pub fn new(id: EngineId, display_name: impl Into<String>, test_type: TestType) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            test_type,
            tags: BTreeSet::new(),
            source: None,
        }
    }

    /// Creates a new identifier for a node executed as a test.
    pub fn test(id: EngineId, display_name: impl Into<String>) -> Self {
        Self::new(id, display_name, TestType::Test)
    }

    /// Creates a new identifier for a container node.
    pub fn container(id: EngineId, display_name: impl Into<String>) -> Self {
        Self::new(id, display_name, TestType::Container)
    }

    /// Adds tags to this identifier.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets where this test was defined.
    pub fn with_source(mut self, source: TestSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the engine identifier.
    pub fn id(&self) -> &EngineId {
        &self.id
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the kind of node this is.
    pub fn test_type(&self) -> TestType {
        self.test_type
    }

    /// Returns true if this node is executed as a test. Only tests are tracked by the collector.
    pub fn is_test(&self) -> bool {
        self.test_type.is_test()
    }

    /// Returns the tags attached to this node.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns where this node was defined, if known.
    pub fn source(&self) -> Option<&TestSource> {
        self.source.as_ref()
    }

    /// Converts this identifier into the form stored in the report.
    pub fn to_info(&self) -> TestIdentifierInfo {
        TestIdentifierInfo {
            display_name: self.display_name.clone(),
            test_type: self.test_type,
            tags: self.tags.clone(),
            test_source_name: self.source.as_ref().map(|source| source.name().to_owned()),
            test_source_full: self.source.as_ref().map(TestSource::full),
        }
    }
}
