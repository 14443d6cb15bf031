//! Built-in function overloads for `$filter` and `$orderby`
//!
//! Overloads are ranked by the total conversion cost of their arguments;
//! two candidates with the same lowest cost make the call ambiguous.

use indexmap::IndexMap;
use odata_uri_diagnostics::{OD0104, OD0114, OD0404, Result, UriError};
use odata_uri_literal::Coercer;
use odata_uri_schema::PrimitiveKind::{self, Boolean, Date, DateTimeOffset, Decimal, Double, Int32, TimeOfDay};
use once_cell::sync::Lazy;

const STRING: PrimitiveKind = PrimitiveKind::String;

/// Parameter and return kinds of a built-in function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub parameters: Vec<PrimitiveKind>,
    pub return_type: PrimitiveKind,
}

impl FunctionSignature {
    pub fn new(parameters: &[PrimitiveKind], return_type: PrimitiveKind) -> Self {
        Self {
            parameters: parameters.to_vec(),
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// Result of overload resolution
#[derive(Debug, Clone)]
pub struct ResolvedOverload {
    pub name: String,
    pub signature: FunctionSignature,
    pub conversion_cost: u32,
}

/// Functions whose argument is a type name rather than a value
pub fn is_type_function(name: &str) -> bool {
    matches!(name, "cast" | "isof")
}

/// Table of built-in function overloads
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    coercer: Coercer,
    overloads: IndexMap<String, Vec<FunctionSignature>>,
}

static STANDARD: Lazy<FunctionTable> = Lazy::new(FunctionTable::with_standard_functions);

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared table of the standard string, date and math functions
    pub fn standard() -> &'static FunctionTable {
        &STANDARD
    }

    pub fn with_standard_functions() -> Self {
        let mut table = Self::new();
        table.register_standard_functions();
        table
    }

    pub fn register(&mut self, name: impl Into<String>, signature: FunctionSignature) {
        self.overloads.entry(name.into()).or_default().push(signature);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.overloads.contains_key(name) || is_type_function(name)
    }

    fn register_standard_functions(&mut self) {
        for name in ["contains", "startswith", "endswith"] {
            self.register(name, FunctionSignature::new(&[STRING, STRING], Boolean));
        }
        self.register("length", FunctionSignature::new(&[STRING], Int32));
        self.register("indexof", FunctionSignature::new(&[STRING, STRING], Int32));
        self.register("substring", FunctionSignature::new(&[STRING, Int32], STRING));
        self.register("substring", FunctionSignature::new(&[STRING, Int32, Int32], STRING));
        for name in ["tolower", "toupper", "trim"] {
            self.register(name, FunctionSignature::new(&[STRING], STRING));
        }
        self.register("concat", FunctionSignature::new(&[STRING, STRING], STRING));

        for name in ["year", "month", "day"] {
            self.register(name, FunctionSignature::new(&[Date], Int32));
            self.register(name, FunctionSignature::new(&[DateTimeOffset], Int32));
        }
        for name in ["hour", "minute", "second"] {
            self.register(name, FunctionSignature::new(&[DateTimeOffset], Int32));
            self.register(name, FunctionSignature::new(&[TimeOfDay], Int32));
        }
        self.register("date", FunctionSignature::new(&[DateTimeOffset], Date));
        self.register("time", FunctionSignature::new(&[DateTimeOffset], TimeOfDay));
        self.register("now", FunctionSignature::new(&[], DateTimeOffset));

        for name in ["round", "floor", "ceiling"] {
            self.register(name, FunctionSignature::new(&[Double], Double));
            self.register(name, FunctionSignature::new(&[Decimal], Decimal));
        }
    }

    /// Pick the cheapest overload. `None` argument kinds (untyped nulls,
    /// open properties) match any parameter at no cost.
    pub fn resolve(&self, name: &str, arguments: &[Option<PrimitiveKind>]) -> Result<ResolvedOverload> {
        let overloads = self.overloads.get(name).ok_or_else(|| {
            UriError::resolution(OD0104, format!("Unknown function '{}'", name))
        })?;

        let mut candidates: Vec<(&FunctionSignature, u32)> = overloads
            .iter()
            .filter_map(|sig| self.overload_cost(sig, arguments).map(|cost| (sig, cost)))
            .collect();

        if candidates.is_empty() {
            let args = arguments
                .iter()
                .map(|a| a.map_or("null", |k| k.qualified_name()))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(UriError::binding(
                OD0404,
                format!("No overload of '{}' accepts ({})", name, args),
            ));
        }

        candidates.sort_by_key(|(_, cost)| *cost);
        if candidates.len() > 1 && candidates[0].1 == candidates[1].1 {
            return Err(UriError::resolution(
                OD0114,
                format!("Call to '{}' matches several overloads", name),
            ));
        }

        let (signature, conversion_cost) = candidates.remove(0);
        Ok(ResolvedOverload {
            name: name.to_string(),
            signature: signature.clone(),
            conversion_cost,
        })
    }

    fn overload_cost(&self, sig: &FunctionSignature, arguments: &[Option<PrimitiveKind>]) -> Option<u32> {
        if sig.arity() != arguments.len() {
            return None;
        }
        sig.parameters
            .iter()
            .zip(arguments)
            .try_fold(0u32, |total, (param, arg)| match arg {
                None => Some(total),
                Some(kind) => self.coercer.conversion_cost(*kind, *param).map(|c| total + c),
            })
    }
}
