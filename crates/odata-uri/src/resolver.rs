//! One-call request resolution

use odata_uri_diagnostics::Result;
use odata_uri_schema::Schema;
use odata_uri_semantic::{
    BoundExpr, BoundQueryOptions, ODataPath, OrderByClause, PathWalker, QueryBinder,
    ResolverPolicy, SelectExpandClause,
};
use odata_uri_syntax::{QueryOptionsToken, RawPath};

use crate::ParserSettings;

/// A request as it arrives: path segments plus option tokens
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    pub path: RawPath,
    pub options: QueryOptionsToken,
}

impl RawRequest {
    pub fn new(path: RawPath) -> Self {
        Self {
            path,
            options: QueryOptionsToken::default(),
        }
    }

    /// Split `path` text and attach no options
    pub fn parse(path: &str) -> Result<Self> {
        Ok(Self::new(RawPath::parse(path)?))
    }

    pub fn with_options(mut self, options: QueryOptionsToken) -> Self {
        self.options = options;
        self
    }
}

/// A fully resolved request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub path: ODataPath,
    pub filter: Option<BoundExpr>,
    pub order_by: Vec<OrderByClause>,
    pub select_expand: SelectExpandClause,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,
    pub search: Option<String>,
}

impl ResolvedRequest {
    fn new(path: ODataPath, options: BoundQueryOptions) -> Self {
        Self {
            path,
            filter: options.filter,
            order_by: options.order_by,
            select_expand: options.select_expand,
            top: options.top,
            skip: options.skip,
            count: options.count,
            search: options.search,
        }
    }
}

/// Resolves requests against one schema with fixed settings.
///
/// The resolver holds no per-request state; one instance can serve any
/// number of requests, from any number of threads.
#[derive(Debug)]
pub struct QueryResolver<'s> {
    schema: &'s Schema,
    settings: ParserSettings,
    policy: Box<dyn ResolverPolicy>,
}

impl<'s> QueryResolver<'s> {
    pub fn new(schema: &'s Schema, settings: ParserSettings) -> Self {
        let policy = settings.policy();
        Self {
            schema,
            settings,
            policy,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn policy(&self) -> &dyn ResolverPolicy {
        self.policy.as_ref()
    }

    pub fn resolve_path(&self, path: &RawPath) -> Result<ODataPath> {
        PathWalker::new(self.schema, self.policy())
            .with_version(self.settings.protocol_version)
            .with_limits(self.settings.limits())
            .walk(path)
    }

    /// Resolve the path, then bind the options against what it addresses
    pub fn resolve(&self, request: &RawRequest) -> Result<ResolvedRequest> {
        let path = self.resolve_path(&request.path)?;
        log::trace!("resolved {} to {:?}", path.to_uri(), path.kind());

        let options = QueryBinder::new(self.schema, self.policy())
            .with_limits(self.settings.limits())
            .with_version(self.settings.protocol_version)
            .bind_options(&request.options, &path)?;
        Ok(ResolvedRequest::new(path, options))
    }
}
