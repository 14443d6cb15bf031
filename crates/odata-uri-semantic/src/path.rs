//! Resolved resource paths

use odata_uri_literal::ProtocolVersion;
use odata_uri_schema::{NavigationSource, SchemaType};
use std::fmt;

use crate::segment::render_segments;
use crate::{PathSegment, WalkerState};

/// What a resolved path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Empty path: the service document
    Service,
    /// A single entity, complex value or primitive value
    Resource,
    Collection,
    Count,
    Value,
    Reference,
    Operation,
    Metadata,
    Batch,
}

/// A fully resolved resource path
#[derive(Debug, Clone, PartialEq)]
pub struct ODataPath {
    segments: Vec<PathSegment>,
    canonical: Vec<PathSegment>,
    target_type: Option<SchemaType>,
    target_source: Option<NavigationSource>,
    is_raw_value: bool,
    is_reference: bool,
    is_operation_result: bool,
    version: ProtocolVersion,
}

impl ODataPath {
    pub(crate) fn new(
        segments: Vec<PathSegment>,
        canonical: Vec<PathSegment>,
        state: WalkerState,
        version: ProtocolVersion,
    ) -> Self {
        Self {
            segments,
            canonical,
            target_type: state.ty,
            target_source: state.source,
            is_raw_value: state.is_raw_value,
            is_reference: state.is_reference,
            is_operation_result: state.is_operation_result,
            version,
        }
    }

    /// The empty path addressing the service document
    pub fn service() -> Self {
        Self::new(Vec::new(), Vec::new(), WalkerState::default(), ProtocolVersion::default())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn canonical_segments(&self) -> &[PathSegment] {
        &self.canonical
    }

    pub fn first(&self) -> Option<&PathSegment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Type addressed by the whole path; `None` for service, batch and
    /// metadata paths, dynamic properties and operations without result
    pub fn target_type(&self) -> Option<&SchemaType> {
        self.target_type.as_ref()
    }

    /// Navigation source addressed by the whole path, if known
    pub fn target_navigation_source(&self) -> Option<&NavigationSource> {
        self.target_source.as_ref()
    }

    pub fn is_collection(&self) -> bool {
        self.target_type.as_ref().is_some_and(SchemaType::is_collection)
    }

    pub fn is_raw_value(&self) -> bool {
        self.is_raw_value
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn is_operation_result(&self) -> bool {
        self.is_operation_result
    }

    pub fn kind(&self) -> PathKind {
        match self.segments.last() {
            None => PathKind::Service,
            Some(PathSegment::Count) => PathKind::Count,
            Some(PathSegment::Value { .. }) => PathKind::Value,
            Some(PathSegment::NavigationLink) => PathKind::Reference,
            Some(PathSegment::Metadata) => PathKind::Metadata,
            Some(PathSegment::Batch) => PathKind::Batch,
            Some(PathSegment::Operation { .. }) => PathKind::Operation,
            Some(_) if self.is_collection() => PathKind::Collection,
            Some(_) => PathKind::Resource,
        }
    }

    /// The path as written, with normalized literals
    pub fn to_uri(&self) -> String {
        render_segments(&self.segments, self.version)
    }

    /// URI of the collection or singleton holding the addressed resource:
    /// trailing property and system segments are dropped, then the last key
    pub fn container_uri(&self) -> String {
        let mut end = self.segments.len();
        while end > 0
            && matches!(
                self.segments[end - 1],
                PathSegment::Count
                    | PathSegment::Value { .. }
                    | PathSegment::NavigationLink
                    | PathSegment::Property { .. }
                    | PathSegment::DynamicProperty { .. }
                    | PathSegment::TypeCast { .. }
            )
        {
            end -= 1;
        }
        if end > 0 && self.segments[end - 1].is_key() {
            end -= 1;
        }
        render_segments(&self.segments[..end], self.version)
    }

    /// Shortest URI for the same resource: keyed entities reached through
    /// a bound navigation are addressed from their own entity set
    pub fn canonical_uri(&self) -> String {
        render_segments(&self.canonical, self.version)
    }
}

impl fmt::Display for ODataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_path() {
        let path = ODataPath::service();
        assert_eq!(path.kind(), PathKind::Service);
        assert_eq!(path.to_uri(), "/");
        assert_eq!(path.container_uri(), "/");
        assert!(path.target_type().is_none());
    }
}
