//! Conversion optimizer

use serde::{Deserialize, Serialize};

use crate::conversion::Conversion;

/// Rewrites applied to conversions after each rewrite step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    /// Leave conversions as built
    None,
    /// Flatten compositions, drop identities and fuse adjacent lifts
    #[default]
    Fuse,
}

impl Optimizer {
    /// Optimize a conversion
    #[must_use]
    pub fn optimize(self, conversion: Conversion) -> Conversion {
        match self {
            Self::None => conversion,
            Self::Fuse => fuse(conversion),
        }
    }
}

// lift(p, f) ; lift(p, g) == lift(p, f ; g)
fn fuse(conversion: Conversion) -> Conversion {
    match conversion {
        Conversion::Compose(parts) => {
            let mut out: Vec<Conversion> = Vec::with_capacity(parts.len());
            for part in parts.into_iter().map(fuse) {
                let pieces = match part {
                    Conversion::Compose(inner) => inner,
                    Conversion::Id => Vec::new(),
                    other => vec![other],
                };
                for piece in pieces {
                    match (out.pop(), piece) {
                        (Some(Conversion::Lift(p, f)), Conversion::Lift(q, g)) if p == q => {
                            let merged = Conversion::lift(p, fuse(Conversion::compose(vec![*f, *g])));
                            if !merged.is_id() {
                                out.push(merged);
                            }
                        }
                        (last, piece) => {
                            out.extend(last);
                            out.push(piece);
                        }
                    }
                }
            }
            Conversion::compose(out)
        }
        Conversion::Lift(path, inner) => Conversion::lift(path, fuse(*inner)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::optic::Step;

    fn inc() -> Conversion {
        Conversion::function("inc", |d| Ok(Data::Long(d.as_i64().unwrap_or(0) + 1)))
    }

    #[test]
    fn adjacent_lifts_through_same_path_fuse() {
        let f = inc();
        let g = inc();
        let c = Conversion::Compose(vec![
            Conversion::Lift(vec![Step::First], Box::new(f.clone())),
            Conversion::Lift(vec![Step::First], Box::new(g.clone())),
        ]);
        let fused = Optimizer::Fuse.optimize(c);
        assert_eq!(
            fused,
            Conversion::Lift(vec![Step::First], Box::new(Conversion::Compose(vec![f, g])))
        );
    }

    #[test]
    fn lifts_through_different_paths_stay_apart() {
        let c = Conversion::Compose(vec![
            Conversion::Lift(vec![Step::First], Box::new(inc())),
            Conversion::Lift(vec![Step::Second], Box::new(inc())),
        ]);
        let fused = Optimizer::Fuse.optimize(c.clone());
        assert_eq!(fused, c);
    }

    #[test]
    fn identity_lifts_collapse() {
        let c = Conversion::Compose(vec![
            Conversion::Lift(vec![Step::Elements], Box::new(Conversion::Id)),
            Conversion::Id,
        ]);
        assert_eq!(Optimizer::Fuse.optimize(c), Conversion::Id);
    }

    #[test]
    fn none_leaves_conversion_alone() {
        let c = Conversion::Compose(vec![
            Conversion::Lift(vec![Step::Elements], Box::new(Conversion::Id)),
        ]);
        assert_eq!(Optimizer::None.optimize(c.clone()), c);
    }

    #[test]
    fn fused_conversion_behaves_the_same() {
        let c = Conversion::Compose(vec![
            Conversion::Lift(vec![Step::Elements], Box::new(inc())),
            Conversion::Lift(vec![Step::Elements], Box::new(inc())),
        ]);
        let data = Data::List(vec![Data::Long(1), Data::Long(5)]);
        let fused = Optimizer::Fuse.optimize(c.clone());
        assert_eq!(fused.apply(data.clone()).unwrap(), c.apply(data).unwrap());
    }
}
