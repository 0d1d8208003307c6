//! Data fixes
//!
//! A [`DataFix`] anchors a rewrite rule to the schema version it produces.
//! Fixes build their rules through a [`FixContext`], which resolves types in
//! the schemas on either side of the fix and wraps the common kinds of
//! change:
//!
//! - raw transforms through the opaque representation
//!   ([`FixContext::write_fix_and_read`])
//! - re-encoding into a wider type ([`FixContext::write_and_read`])
//! - retyping without touching the data ([`FixContext::convert_unchecked`])
//! - explicit conversions ([`FixContext::fix_type_everywhere`])
//! - typed transforms with a checked output type
//!   ([`FixContext::fix_type_everywhere_typed`])

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use shift_dynamic::{Recoverable, Value, ValueOps};
use shift_types::{
    Conversion, ConversionError, ConversionResult, Data, Optimizer, ReadOptions, RecursionSet,
    RewriteResult, RewriteRule, Schema, Type, Typed, View,
};

use crate::error::FixError;

/// One migration step, producing schema version [`DataFix::version_key`]
pub trait DataFix: Send + Sync {
    /// Fix name, for logs and conversion names
    fn name(&self) -> &str;

    /// Version key of the schema this fix produces
    fn version_key(&self) -> u32;

    /// Build the rewrite rule
    ///
    /// Called at most once per fixer; the rule is cached.
    fn make_rule(&self, ctx: &FixContext<'_>) -> Result<RewriteRule, FixError>;
}

/// Schemas and settings a fix builds its rule against
#[derive(Debug, Clone, Copy)]
pub struct FixContext<'a> {
    fix: &'a str,
    input: &'a Schema,
    output: &'a Schema,
    optimizer: Optimizer,
    read_options: ReadOptions,
}

impl<'a> FixContext<'a> {
    /// Context for fix `fix` from `input` to `output`
    #[must_use]
    pub fn new(
        fix: &'a str,
        input: &'a Schema,
        output: &'a Schema,
        optimizer: Optimizer,
        read_options: ReadOptions,
    ) -> Self {
        Self {
            fix,
            input,
            output,
            optimizer,
            read_options,
        }
    }

    /// Schema before the fix
    #[inline]
    #[must_use]
    pub fn input_schema(&self) -> &'a Schema {
        self.input
    }

    /// Schema after the fix
    #[inline]
    #[must_use]
    pub fn output_schema(&self) -> &'a Schema {
        self.output
    }

    /// Type `name` before the fix
    pub fn input_type(&self, name: &str) -> Result<Type, FixError> {
        self.input.get_type(name).map_err(|source| FixError::Schema {
            fix: self.fix.to_string(),
            source,
        })
    }

    /// Type `name` after the fix
    pub fn output_type(&self, name: &str) -> Result<Type, FixError> {
        self.output.get_type(name).map_err(|source| FixError::Schema {
            fix: self.fix.to_string(),
            source,
        })
    }

    /// Rewrite every occurrence of `input` into `output` with `conversion`
    #[must_use]
    pub fn fix_type_everywhere(&self, input: &Type, output: &Type, conversion: Conversion) -> RewriteRule {
        let result = RewriteResult::new(
            View::new(input.clone(), output.clone(), conversion),
            RecursionSet::new(),
        );
        RewriteRule::everywhere(
            RewriteRule::if_same(input.clone(), result),
            self.optimizer,
            true,
            true,
        )
    }

    /// Rewrite every occurrence of `input` with a typed transform
    ///
    /// # Panics
    ///
    /// The returned rule panics while migrating if `f` produces a value whose
    /// type is not shape-equal to `output`: that is a bug in the fix.
    pub fn fix_type_everywhere_typed(
        &self,
        input: &Type,
        output: &Type,
        f: impl Fn(Typed) -> ConversionResult<Typed> + Send + Sync + 'static,
    ) -> RewriteRule {
        let fix = self.fix.to_string();
        let (from, to) = (input.clone(), output.clone());
        let conversion = Conversion::function(self.fix, move |data| {
            let typed = f(Typed::new(from.clone(), data))?;
            assert!(
                typed.ty().same_shape(&to),
                "fix '{fix}' produced {}, but declared {to}",
                typed.ty()
            );
            Ok(typed.into_data())
        });
        self.fix_type_everywhere(input, output, conversion)
    }

    /// Rewrite every occurrence of `input` by encoding it, transforming the
    /// encoded value and decoding it as `output`
    pub fn write_fix_and_read(
        &self,
        input: &Type,
        output: &Type,
        f: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> RewriteRule {
        let (from, to) = (input.clone(), output.clone());
        let options = self.read_options;
        let conversion = Conversion::function(self.fix, move |data| {
            let encoded = from.write(&ValueOps, Value::Empty, &data)?;
            decode(&to, f(encoded), &options)
        });
        self.fix_type_everywhere(input, output, conversion)
    }

    /// Re-encode `input` as `output`, for widenings the codecs accept
    pub fn write_and_read(&self, input: &Type, output: &Type) -> RewriteRule {
        self.write_fix_and_read(input, output, |value| value)
    }

    /// Retype `input` as `output` without touching the data
    ///
    /// Only valid when both types decode to the same data shape.
    #[must_use]
    pub fn convert_unchecked(&self, input: &Type, output: &Type) -> RewriteRule {
        self.fix_type_everywhere(input, output, Conversion::Id)
    }

    /// Rename field `from` to `to` in type `type_name`
    pub fn rename_field(&self, type_name: &str, from: &str, to: &str) -> Result<RewriteRule, FixError> {
        let input = self.input_type(type_name)?;
        let output = self.output_type(type_name)?;
        input.find_field(from).into_result().map_err(|source| FixError::Field {
            fix: self.fix.to_string(),
            source,
        })?;
        let (from, to) = (from.to_string(), to.to_string());
        Ok(self.fix_type_everywhere_typed(&input, &output, move |typed| {
            typed.rename_field(&from, &to)
        }))
    }
}

fn decode(ty: &Type, value: Value, options: &ReadOptions) -> ConversionResult<Data> {
    match ty.read(&ValueOps, value, options) {
        Recoverable::Ok((_, data)) => Ok(data),
        Recoverable::Err {
            error,
            partial: Some((_, data)),
        } if !error.is_fatal() => {
            tracing::warn!(%error, "decoded partially after transform");
            Ok(data)
        }
        Recoverable::Miss(error) | Recoverable::Err { error, .. } => Err(ConversionError::Decode(error)),
    }
}

type RuleFn = dyn Fn(&FixContext<'_>) -> Result<RewriteRule, FixError> + Send + Sync;

/// Fix built from a closure
#[derive(Clone)]
pub struct SimpleFix {
    name: String,
    version_key: u32,
    make: Arc<RuleFn>,
}

impl SimpleFix {
    /// Create a fix
    pub fn new(
        name: impl Into<String>,
        version_key: u32,
        make: impl Fn(&FixContext<'_>) -> Result<RewriteRule, FixError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            version_key,
            make: Arc::new(make),
        }
    }
}

impl Debug for SimpleFix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleFix")
            .field("name", &self.name)
            .field("version_key", &self.version_key)
            .finish_non_exhaustive()
    }
}

impl DataFix for SimpleFix {
    fn name(&self) -> &str {
        &self.name
    }

    fn version_key(&self) -> u32 {
        self.version_key
    }

    fn make_rule(&self, ctx: &FixContext<'_>) -> Result<RewriteRule, FixError> {
        (self.make)(ctx)
    }
}

/// Renames one field of a named type
#[derive(Debug, Clone)]
pub struct RenameFieldFix {
    name: String,
    version_key: u32,
    type_name: String,
    from: String,
    to: String,
}

impl RenameFieldFix {
    /// Rename `from` to `to` in `type_name` at `version_key`
    pub fn new(
        version_key: u32,
        type_name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let (type_name, from, to) = (type_name.into(), from.into(), to.into());
        Self {
            name: format!("rename {type_name}.{from} to {to}"),
            version_key,
            type_name,
            from,
            to,
        }
    }
}

impl DataFix for RenameFieldFix {
    fn name(&self) -> &str {
        &self.name
    }

    fn version_key(&self) -> u32 {
        self.version_key
    }

    fn make_rule(&self, ctx: &FixContext<'_>) -> Result<RewriteRule, FixError> {
        ctx.rename_field(&self.type_name, &self.from, &self.to)
    }
}

/// Re-encodes a named type into its new, wider shape
#[derive(Debug, Clone)]
pub struct WidenTypeFix {
    name: String,
    version_key: u32,
    type_name: String,
}

impl WidenTypeFix {
    /// Widen `type_name` at `version_key`
    pub fn new(version_key: u32, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            name: format!("widen {type_name}"),
            version_key,
            type_name,
        }
    }
}

impl DataFix for WidenTypeFix {
    fn name(&self) -> &str {
        &self.name
    }

    fn version_key(&self) -> u32 {
        self.version_key
    }

    fn make_rule(&self, ctx: &FixContext<'_>) -> Result<RewriteRule, FixError> {
        let input = ctx.input_type(&self.type_name)?;
        let output = ctx.output_type(&self.type_name)?;
        if input == output {
            return Ok(RewriteRule::nop());
        }
        Ok(ctx.write_and_read(&input, &output))
    }
}
