//! Typed optics
//!
//! An optic is a path of [`Step`]s into decoded [`Data`] together with the
//! [`Capability`] it guarantees. Capabilities form a lattice: composing two
//! optics joins their capabilities, and [`TypedOptic::upcast`] refuses to
//! treat an optic as something stronger than it is.
//!
//! # Example
//!
//! ```rust,ignore
//! let optic = player.find_field("name").ok().unwrap();
//! let lens = optic.as_lens().unwrap();
//! let name = lens.view(&data)?;
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use crate::conversion::Conversion;
use crate::data::Data;
use crate::error::{ConversionError, ConversionResult};
use crate::types::Type;

/// Total invertible data transform
pub type IsoFn = Arc<dyn Fn(Data) -> ConversionResult<Data> + Send + Sync>;

/// Named pair of inverse transforms
#[derive(Clone)]
pub struct Iso {
    name: Arc<str>,
    to: IsoFn,
    from: IsoFn,
}

impl Iso {
    /// Create an isomorphism from its two directions
    pub fn new(
        name: impl Into<Arc<str>>,
        to: impl Fn(Data) -> ConversionResult<Data> + Send + Sync + 'static,
        from: impl Fn(Data) -> ConversionResult<Data> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    /// Isomorphism name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Iso {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.to, &other.to) && Arc::ptr_eq(&self.from, &other.from)
    }
}

impl Debug for Iso {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Iso({})", self.name)
    }
}

/// One step of an optic path
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// First half of a pair
    First,
    /// Second half of a pair
    Second,
    /// Left branch of a sum, skipped on the right
    Left,
    /// Right branch of a sum, skipped on the left
    Right,
    /// One tagged choice alternative, skipped for other keys
    Tag(String),
    /// Every list element
    Elements,
    /// Separate paths for both branches of a sum
    Either(Vec<Step>, Vec<Step>),
    /// Separate paths for several tagged choice alternatives
    Branches {
        /// Path per alternative key
        paths: BTreeMap<String, Vec<Step>>,
        /// Whether every alternative of the choice has a path
        total: bool,
    },
    /// Total invertible view
    Iso(Iso),
}

impl Step {
    /// Capability a single step guarantees
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::Iso(_) => Capability::Iso,
            Self::First | Self::Second => Capability::Lens,
            Self::Left | Self::Right | Self::Tag(_) => Capability::Prism,
            Self::Elements => Capability::Traversal,
            Self::Either(l, r) => path_capability(l)
                .join(path_capability(r))
                .join(Capability::Lens),
            Self::Branches { paths, total } => {
                let outer = if *total { Capability::Lens } else { Capability::Affine };
                paths
                    .values()
                    .fold(outer, |acc, path| acc.join(path_capability(path)))
            }
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Tag(key) => write!(f, "tag({key})"),
            Self::Elements => write!(f, "elements"),
            Self::Either(..) => write!(f, "either"),
            Self::Branches { paths, .. } => {
                write!(f, "branches(")?;
                for (i, key) in paths.keys().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, ")")
            }
            Self::Iso(iso) => write!(f, "iso({})", iso.name()),
        }
    }
}

fn path_capability(path: &[Step]) -> Capability {
    path.iter()
        .fold(Capability::Iso, |acc, step| acc.join(step.capability()))
}

fn mismatch(step: &Step, data: &Data) -> ConversionError {
    ConversionError::StepMismatch {
        step: step.to_string(),
        found: data.kind(),
    }
}

/// Apply `f` to every focus of `path` inside `data`
pub fn modify_path(
    path: &[Step],
    data: Data,
    f: &mut dyn FnMut(Data) -> ConversionResult<Data>,
) -> ConversionResult<Data> {
    let Some((step, rest)) = path.split_first() else {
        return f(data);
    };
    match (step, data) {
        (Step::First, Data::Pair(a, b)) => Ok(Data::Pair(Box::new(modify_path(rest, *a, f)?), b)),
        (Step::Second, Data::Pair(a, b)) => Ok(Data::Pair(a, Box::new(modify_path(rest, *b, f)?))),
        (Step::Left, Data::Left(x)) => Ok(Data::left(modify_path(rest, *x, f)?)),
        (Step::Left, skipped @ Data::Right(_)) | (Step::Right, skipped @ Data::Left(_)) => Ok(skipped),
        (Step::Right, Data::Right(x)) => Ok(Data::right(modify_path(rest, *x, f)?)),
        (Step::Tag(key), Data::Tagged(k, x)) => {
            if *key == k {
                Ok(Data::Tagged(k, Box::new(modify_path(rest, *x, f)?)))
            } else {
                Ok(Data::Tagged(k, x))
            }
        }
        (Step::Elements, Data::List(items)) => items
            .into_iter()
            .map(|item| modify_path(rest, item, f))
            .collect::<ConversionResult<Vec<_>>>()
            .map(Data::List),
        (Step::Either(l, _), Data::Left(x)) => Ok(Data::left(modify_path(l, *x, &mut |y| {
            modify_path(rest, y, f)
        })?)),
        (Step::Either(_, r), Data::Right(x)) => Ok(Data::right(modify_path(r, *x, &mut |y| {
            modify_path(rest, y, f)
        })?)),
        (Step::Branches { paths, .. }, Data::Tagged(k, x)) => match paths.get(&k) {
            Some(branch) => {
                let x = modify_path(branch, *x, &mut |y| modify_path(rest, y, f))?;
                Ok(Data::Tagged(k, Box::new(x)))
            }
            None => Ok(Data::Tagged(k, x)),
        },
        (Step::Iso(iso), data) => {
            let focus = (iso.to)(data)?;
            let focus = modify_path(rest, focus, f)?;
            (iso.from)(focus)
        }
        (step, data) => Err(mismatch(step, &data)),
    }
}

/// Collect every focus of `path` inside `data`
pub fn collect_path(path: &[Step], data: &Data, out: &mut Vec<Data>) -> ConversionResult<()> {
    let Some((step, rest)) = path.split_first() else {
        out.push(data.clone());
        return Ok(());
    };
    match (step, data) {
        (Step::First, Data::Pair(a, _)) => collect_path(rest, a, out),
        (Step::Second, Data::Pair(_, b)) => collect_path(rest, b, out),
        (Step::Left, Data::Left(x)) | (Step::Right, Data::Right(x)) => collect_path(rest, x, out),
        (Step::Left, Data::Right(_)) | (Step::Right, Data::Left(_)) => Ok(()),
        (Step::Tag(key), Data::Tagged(k, x)) => {
            if key == k {
                collect_path(rest, x, out)
            } else {
                Ok(())
            }
        }
        (Step::Elements, Data::List(items)) => {
            items.iter().try_for_each(|item| collect_path(rest, item, out))
        }
        (Step::Either(l, _), Data::Left(x)) | (Step::Either(_, l), Data::Right(x)) => {
            let mut inner = Vec::new();
            collect_path(l, x, &mut inner)?;
            inner.iter().try_for_each(|y| collect_path(rest, y, out))
        }
        (Step::Branches { paths, .. }, Data::Tagged(k, x)) => match paths.get(k) {
            Some(branch) => {
                let mut inner = Vec::new();
                collect_path(branch, x, &mut inner)?;
                inner.iter().try_for_each(|y| collect_path(rest, y, out))
            }
            None => Ok(()),
        },
        (Step::Iso(iso), data) => {
            let focus = (iso.to)(data.clone())?;
            collect_path(rest, &focus, out)
        }
        (step, data) => Err(mismatch(step, data)),
    }
}

/// Guarantee an optic gives about its foci
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Exactly one focus, invertible
    Iso,
    /// Exactly one focus
    Lens,
    /// At most one focus, rebuildable from the focus alone
    Prism,
    /// At most one focus
    Affine,
    /// Any number of foci
    Traversal,
}

impl Capability {
    /// Least capability implied by both
    #[must_use]
    pub fn join(self, other: Capability) -> Capability {
        use Capability::{Affine, Iso, Lens, Prism, Traversal};
        match (self, other) {
            (a, b) if a == b => a,
            (Iso, x) | (x, Iso) => x,
            (Traversal, _) | (_, Traversal) => Traversal,
            _ => Affine,
        }
    }

    /// Whether an optic with this capability can be used as `required`
    #[inline]
    #[must_use]
    pub fn satisfies(self, required: Capability) -> bool {
        self.join(required) == required
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Iso => "iso",
            Self::Lens => "lens",
            Self::Prism => "prism",
            Self::Affine => "affine",
            Self::Traversal => "traversal",
        };
        f.write_str(name)
    }
}

/// Accessor from a source type to a focus type, with the types after an
/// update of the focus
#[derive(Debug, Clone, PartialEq)]
pub struct TypedOptic {
    source: Type,
    target: Type,
    focus: Type,
    focus_target: Type,
    path: Vec<Step>,
    capability: Capability,
}

impl TypedOptic {
    /// Optic focusing on the whole value
    #[must_use]
    pub fn identity(focus: Type, focus_target: Type) -> Self {
        Self {
            source: focus.clone(),
            target: focus_target.clone(),
            focus,
            focus_target,
            path: Vec::new(),
            capability: Capability::Iso,
        }
    }

    /// Single-isomorphism optic
    #[must_use]
    pub fn iso(source: Type, focus: Type, iso: Iso) -> Self {
        Self {
            source: source.clone(),
            target: source,
            focus: focus.clone(),
            focus_target: focus,
            path: vec![Step::Iso(iso)],
            capability: Capability::Iso,
        }
    }

    /// Wrap this optic one level up, behind `step`
    #[must_use]
    pub(crate) fn behind(self, step: Step, source: Type, target: Type) -> Self {
        let capability = step.capability().join(self.capability);
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(step);
        path.extend(self.path);
        Self {
            source,
            target,
            path,
            capability,
            ..self
        }
    }

    /// Re-root this optic at a transparent parent node
    #[must_use]
    pub(crate) fn reroot(self, source: Type, target: Type) -> Self {
        Self {
            source,
            target,
            ..self
        }
    }

    /// Merge two optics found in both branches of a sum
    #[must_use]
    pub(crate) fn either(left: Self, right: Self, source: Type, target: Type) -> Self {
        let step = Step::Either(left.path, right.path);
        Self {
            source,
            target,
            capability: step.capability(),
            path: vec![step],
            focus: left.focus,
            focus_target: left.focus_target,
        }
    }

    /// Merge optics found in several tagged choice alternatives
    ///
    /// The merge is total when every alternative holds the focus.
    #[must_use]
    pub(crate) fn branches(
        found: BTreeMap<String, TypedOptic>,
        total: bool,
        source: Type,
        target: Type,
    ) -> Option<Self> {
        let (focus, focus_target) = found
            .values()
            .next()
            .map(|o| (o.focus.clone(), o.focus_target.clone()))?;
        let step = Step::Branches {
            paths: found.into_iter().map(|(k, o)| (k, o.path)).collect(),
            total,
        };
        Some(Self {
            source,
            target,
            focus,
            focus_target,
            capability: step.capability(),
            path: vec![step],
        })
    }

    /// Compose with an optic rooted at this optic's focus
    #[must_use]
    pub fn compose(&self, inner: &TypedOptic) -> TypedOptic {
        let mut path = self.path.clone();
        path.extend(inner.path.iter().cloned());
        TypedOptic {
            source: self.source.clone(),
            target: self.target.clone(),
            focus: inner.focus.clone(),
            focus_target: inner.focus_target.clone(),
            path,
            capability: self.capability.join(inner.capability),
        }
    }

    /// Type the optic starts from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Type {
        &self.source
    }

    /// Source type after the focus is replaced
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Type {
        &self.target
    }

    /// Type of the focus
    #[inline]
    #[must_use]
    pub fn focus(&self) -> &Type {
        &self.focus
    }

    /// Type of the focus after replacement
    #[inline]
    #[must_use]
    pub fn focus_target(&self) -> &Type {
        &self.focus_target
    }

    /// Path into the data
    #[inline]
    #[must_use]
    pub fn path(&self) -> &[Step] {
        &self.path
    }

    /// Guaranteed capability
    #[inline]
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// This optic, if it is at least as strong as `required`
    #[must_use]
    pub fn upcast(&self, required: Capability) -> Option<TypedOptic> {
        self.capability.satisfies(required).then(|| self.clone())
    }

    /// Lift a conversion of the focus to one of the source
    #[must_use]
    pub fn lift(&self, conversion: Conversion) -> Conversion {
        Conversion::lift(self.path.clone(), conversion)
    }

    /// Apply `f` to every focus
    pub fn modify(
        &self,
        data: Data,
        mut f: impl FnMut(Data) -> ConversionResult<Data>,
    ) -> ConversionResult<Data> {
        modify_path(&self.path, data, &mut f)
    }

    /// Collect every focus
    pub fn collect(&self, data: &Data) -> ConversionResult<Vec<Data>> {
        let mut out = Vec::new();
        collect_path(&self.path, data, &mut out)?;
        Ok(out)
    }

    /// View as an isomorphism
    #[must_use]
    pub fn as_iso(&self) -> Option<IsoView<'_>> {
        self.capability.satisfies(Capability::Iso).then_some(IsoView(self))
    }

    /// View as a lens
    #[must_use]
    pub fn as_lens(&self) -> Option<LensView<'_>> {
        self.capability.satisfies(Capability::Lens).then_some(LensView(self))
    }

    /// View as an affine traversal
    #[must_use]
    pub fn as_affine(&self) -> Option<AffineView<'_>> {
        self.capability.satisfies(Capability::Affine).then_some(AffineView(self))
    }

    /// View as a traversal
    #[must_use]
    pub fn as_traversal(&self) -> Option<TraversalView<'_>> {
        self.capability.satisfies(Capability::Traversal).then_some(TraversalView(self))
    }
}

fn exactly_one(optic: &TypedOptic, data: &Data) -> ConversionResult<Data> {
    let mut foci = optic.collect(data)?;
    match foci.len() {
        1 => Ok(foci.remove(0)),
        n => Err(ConversionError::Failed(format!(
            "expected exactly one focus at {}, found {n}",
            optic.focus()
        ))),
    }
}

/// Isomorphism operations
#[derive(Debug, Clone, Copy)]
pub struct IsoView<'a>(&'a TypedOptic);

impl IsoView<'_> {
    /// Source to focus
    pub fn to(&self, data: &Data) -> ConversionResult<Data> {
        exactly_one(self.0, data)
    }

    /// Focus back to source
    pub fn from(&self, focus: Data) -> ConversionResult<Data> {
        self.0.path.iter().rev().try_fold(focus, |acc, step| match step {
            Step::Iso(iso) => (iso.from)(acc),
            other => Err(mismatch(other, &acc)),
        })
    }
}

/// Lens operations
#[derive(Debug, Clone, Copy)]
pub struct LensView<'a>(&'a TypedOptic);

impl LensView<'_> {
    /// Read the focus
    pub fn view(&self, data: &Data) -> ConversionResult<Data> {
        exactly_one(self.0, data)
    }

    /// Replace the focus
    pub fn set(&self, data: Data, focus: Data) -> ConversionResult<Data> {
        self.0.modify(data, |_| Ok(focus.clone()))
    }

    /// Transform the focus
    pub fn update(
        &self,
        data: Data,
        f: impl FnMut(Data) -> ConversionResult<Data>,
    ) -> ConversionResult<Data> {
        self.0.modify(data, f)
    }
}

/// Affine operations
#[derive(Debug, Clone, Copy)]
pub struct AffineView<'a>(&'a TypedOptic);

impl AffineView<'_> {
    /// Read the focus, if present
    pub fn preview(&self, data: &Data) -> ConversionResult<Option<Data>> {
        Ok(self.0.collect(data)?.into_iter().next())
    }

    /// Replace the focus, if present
    pub fn set(&self, data: Data, focus: Data) -> ConversionResult<Data> {
        self.0.modify(data, |_| Ok(focus.clone()))
    }

    /// Transform the focus, if present
    pub fn update(
        &self,
        data: Data,
        f: impl FnMut(Data) -> ConversionResult<Data>,
    ) -> ConversionResult<Data> {
        self.0.modify(data, f)
    }
}

/// Traversal operations
#[derive(Debug, Clone, Copy)]
pub struct TraversalView<'a>(&'a TypedOptic);

impl TraversalView<'_> {
    /// Every focus, in order
    pub fn to_list(&self, data: &Data) -> ConversionResult<Vec<Data>> {
        self.0.collect(data)
    }

    /// Transform every focus
    pub fn update(
        &self,
        data: Data,
        f: impl FnMut(Data) -> ConversionResult<Data>,
    ) -> ConversionResult<Data> {
        self.0.modify(data, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    #[test]
    fn join_is_a_lattice() {
        use Capability::{Affine, Iso, Lens, Prism, Traversal};
        assert_eq!(Iso.join(Lens), Lens);
        assert_eq!(Lens.join(Prism), Affine);
        assert_eq!(Prism.join(Affine), Affine);
        assert_eq!(Affine.join(Traversal), Traversal);
        assert!(Lens.satisfies(Affine));
        assert!(!Affine.satisfies(Lens));
        assert!(!Prism.satisfies(Lens));
        assert!(Iso.satisfies(Traversal));
    }

    #[test]
    fn modify_through_pair_and_list() {
        let data = Data::pair(Data::Int(0), Data::List(vec![Data::Int(1), Data::Int(2)]));
        let out = modify_path(&[Step::Second, Step::Elements], data, &mut |d| {
            Ok(Data::Long(d.as_i64().unwrap_or_default() * 10))
        })
        .unwrap();
        assert_eq!(
            out,
            Data::pair(Data::Int(0), Data::List(vec![Data::Long(10), Data::Long(20)]))
        );
    }

    #[test]
    fn prism_skips_other_branch() {
        let data = Data::right(Data::Unit);
        let out = modify_path(&[Step::Left], data.clone(), &mut |_| Ok(Data::Int(9))).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn step_on_wrong_shape_errors() {
        let err = modify_path(&[Step::First], Data::Int(1), &mut |d| Ok(d)).unwrap_err();
        assert!(matches!(err, ConversionError::StepMismatch { found: "int", .. }));
    }

    #[test]
    fn branches_focus_selected_alternatives() {
        let mut branches = BTreeMap::new();
        branches.insert("circle".to_string(), vec![Step::First]);
        let step = Step::Branches {
            paths: branches,
            total: false,
        };
        assert_eq!(step.capability(), Capability::Affine);
        let circle = Data::tagged("circle", Data::pair(Data::Int(2), Data::Unit));
        let square = Data::tagged("square", Data::pair(Data::Int(3), Data::Unit));
        let mut out = Vec::new();
        collect_path(std::slice::from_ref(&step), &circle, &mut out).unwrap();
        collect_path(std::slice::from_ref(&step), &square, &mut out).unwrap();
        assert_eq!(out, vec![Data::Int(2)]);
    }

    #[test]
    fn upcast_refuses_stronger_capability() {
        let elements = TypedOptic::identity(int(), int()).behind(
            Step::Elements,
            Type::list(int()),
            Type::list(int()),
        );
        assert_eq!(elements.capability(), Capability::Traversal);
        assert!(elements.upcast(Capability::Lens).is_none());
        assert!(elements.as_lens().is_none());
        assert!(elements.upcast(Capability::Traversal).is_some());
        let values = elements
            .as_traversal()
            .unwrap()
            .to_list(&Data::List(vec![Data::Int(1), Data::Int(2)]))
            .unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn iso_view_inverts() {
        let iso = Iso::new(
            "int-as-long",
            |d| Ok(Data::Long(d.as_i64().unwrap_or_default())),
            |d| {
                d.as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .map(Data::Int)
                    .ok_or(ConversionError::TypeMismatch {
                        expected: "long",
                        found: d.kind(),
                    })
            },
        );
        let optic = TypedOptic::iso(int(), Type::primitive(Primitive::Long), iso);
        let view = optic.as_iso().unwrap();
        assert_eq!(view.to(&Data::Int(5)).unwrap(), Data::Long(5));
        assert_eq!(view.from(Data::Long(5)).unwrap(), Data::Int(5));
    }

    #[test]
    fn compose_joins_capabilities() {
        let lens = TypedOptic::identity(int(), int()).behind(
            Step::First,
            Type::product(int(), int()),
            Type::product(int(), int()),
        );
        let prism = TypedOptic::identity(Type::product(int(), int()), Type::product(int(), int()))
            .behind(
                Step::Left,
                Type::sum(Type::product(int(), int()), Type::unit()),
                Type::sum(Type::product(int(), int()), Type::unit()),
            );
        let composed = prism.compose(&lens);
        assert_eq!(composed.capability(), Capability::Affine);
        assert_eq!(composed.path(), &[Step::Left, Step::First]);
        assert!(composed.upcast(Capability::Lens).is_none());
        assert!(composed.upcast(Capability::Prism).is_none());
        assert!(composed.upcast(Capability::Affine).is_some());
    }

    #[test]
    fn total_branches_inside_either_stay_lenses() {
        let mut paths = BTreeMap::new();
        paths.insert("circle".to_string(), vec![Step::First]);
        paths.insert("square".to_string(), vec![Step::First]);
        let total = Step::Branches {
            paths: paths.clone(),
            total: true,
        };
        assert_eq!(total.capability(), Capability::Lens);
        let either = Step::Either(vec![total], vec![Step::First]);
        assert_eq!(either.capability(), Capability::Lens);

        let partial = Step::Branches {
            paths,
            total: false,
        };
        let either = Step::Either(vec![partial], vec![Step::First]);
        assert_eq!(either.capability(), Capability::Affine);
    }
}
