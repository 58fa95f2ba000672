// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dimensional unit registry.
//!
//! Units are stored as a scale (and, for temperature scales, an offset)
//! relative to SI base units plus a dimension vector. Symbols resolve by exact
//! name first, then SI prefix + prefixable unit, then by dropping a plural `s`.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use super::parser::parse_expression;
use super::UnitError;

/// Number of base dimensions tracked.
const BASE_DIMENSIONS: usize = 7;

const DIMENSION_NAMES: [&str; BASE_DIMENSIONS] = [
    "length",
    "mass",
    "time",
    "current",
    "temperature",
    "substance",
    "luminosity",
];

/// Exponents of the SI base dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimension([i8; BASE_DIMENSIONS]);

impl Dimension {
    pub const NONE: Dimension = Dimension([0; BASE_DIMENSIONS]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0, 0, 0]);
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0, 0, 0]);
    pub const CURRENT: Dimension = Dimension([0, 0, 0, 1, 0, 0, 0]);
    pub const TEMPERATURE: Dimension = Dimension([0, 0, 0, 0, 1, 0, 0]);
    pub const SUBSTANCE: Dimension = Dimension([0, 0, 0, 0, 0, 1, 0]);
    pub const LUMINOSITY: Dimension = Dimension([0, 0, 0, 0, 0, 0, 1]);

    /// Build a dimension from `[L, M, T, I, Θ, N, J]` exponents.
    pub const fn new(exponents: [i8; BASE_DIMENSIONS]) -> Self {
        Dimension(exponents)
    }

    /// Check if every exponent is zero.
    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    /// Raise every exponent to `power`, or `None` if an exponent leaves `i8`.
    fn checked_powi(self, power: i32) -> Option<Self> {
        let mut out = self.0;
        for e in out.iter_mut() {
            *e = i32::from(*e)
                .checked_mul(power)
                .and_then(|v| i8::try_from(v).ok())?;
        }
        Some(Dimension(out))
    }

    fn checked_mul(self, other: Dimension) -> Option<Self> {
        let mut out = self.0;
        for (e, o) in out.iter_mut().zip(other.0) {
            *e = e.checked_add(o)?;
        }
        Some(Dimension(out))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("[dimensionless]");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .zip(DIMENSION_NAMES)
            .filter(|(e, _)| **e != 0)
            .map(|(e, name)| match e {
                1 => format!("[{name}]"),
                _ => format!("[{name}]^{e}"),
            })
            .collect();
        f.write_str(&parts.join("*"))
    }
}

/// A unit definition relative to SI base units.
///
/// `value_in_base = value * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub scale: f64,
    pub offset: f64,
    pub dimension: Dimension,
    pub prefixable: bool,
}

impl UnitDef {
    fn linear(scale: f64, dimension: Dimension) -> Self {
        Self {
            scale,
            offset: 0.0,
            dimension,
            prefixable: true,
        }
    }

    fn affine(scale: f64, offset: f64) -> Self {
        Self {
            scale,
            offset,
            dimension: Dimension::TEMPERATURE,
            prefixable: false,
        }
    }

    fn fixed(scale: f64, dimension: Dimension) -> Self {
        Self {
            prefixable: false,
            ..Self::linear(scale, dimension)
        }
    }
}

/// A fully resolved unit expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedUnit {
    pub scale: f64,
    pub offset: f64,
    pub dimension: Dimension,
}

const PREFIXES: &[(&str, f64)] = &[
    ("yotta", 1e24),
    ("zetta", 1e21),
    ("exa", 1e18),
    ("peta", 1e15),
    ("tera", 1e12),
    ("giga", 1e9),
    ("mega", 1e6),
    ("kilo", 1e3),
    ("hecto", 1e2),
    ("deca", 1e1),
    ("deci", 1e-1),
    ("centi", 1e-2),
    ("milli", 1e-3),
    ("micro", 1e-6),
    ("nano", 1e-9),
    ("pico", 1e-12),
    ("femto", 1e-15),
    ("atto", 1e-18),
    ("zepto", 1e-21),
    ("yocto", 1e-24),
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// Registry of named units.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    /// Create a registry with SI, common laboratory units and detector pixels.
    pub fn new() -> Self {
        let mut registry = Self {
            units: HashMap::new(),
        };
        registry.install_defaults();
        registry
    }

    /// Process-wide default registry.
    pub fn shared() -> &'static UnitRegistry {
        static SHARED: OnceLock<UnitRegistry> = OnceLock::new();
        SHARED.get_or_init(UnitRegistry::new)
    }

    fn insert(&mut self, names: &[&str], def: UnitDef) {
        for name in names {
            self.units.insert((*name).to_string(), def);
        }
    }

    fn install_defaults(&mut self) {
        use std::f64::consts::PI;

        let none = Dimension::NONE;
        let force = Dimension::new([1, 1, -2, 0, 0, 0, 0]);
        let pressure = Dimension::new([-1, 1, -2, 0, 0, 0, 0]);
        let energy = Dimension::new([2, 1, -2, 0, 0, 0, 0]);
        let power = Dimension::new([2, 1, -3, 0, 0, 0, 0]);
        let charge = Dimension::new([0, 0, 1, 1, 0, 0, 0]);
        let voltage = Dimension::new([2, 1, -3, -1, 0, 0, 0]);
        let resistance = Dimension::new([2, 1, -3, -2, 0, 0, 0]);
        let volume = Dimension::new([3, 0, 0, 0, 0, 0, 0]);
        let frequency = Dimension::new([0, 0, -1, 0, 0, 0, 0]);

        // Base units
        self.insert(&["m", "meter", "metre"], UnitDef::linear(1.0, Dimension::LENGTH));
        self.insert(&["g", "gram"], UnitDef::linear(1e-3, Dimension::MASS));
        self.insert(&["s", "sec", "second"], UnitDef::linear(1.0, Dimension::TIME));
        self.insert(&["A", "ampere", "amp"], UnitDef::linear(1.0, Dimension::CURRENT));
        self.insert(&["K", "kelvin"], UnitDef::linear(1.0, Dimension::TEMPERATURE));
        self.insert(&["mol", "mole"], UnitDef::linear(1.0, Dimension::SUBSTANCE));
        self.insert(&["cd", "candela"], UnitDef::linear(1.0, Dimension::LUMINOSITY));

        // Length
        self.insert(&["Å", "angstrom", "Angstrom", "ångström"], UnitDef::fixed(1e-10, Dimension::LENGTH));
        self.insert(&["in", "inch"], UnitDef::fixed(0.0254, Dimension::LENGTH));
        self.insert(&["ft", "foot", "feet"], UnitDef::fixed(0.3048, Dimension::LENGTH));

        // Mass
        self.insert(&["t", "tonne"], UnitDef::linear(1e3, Dimension::MASS));
        self.insert(&["u", "Da", "dalton"], UnitDef::linear(1.660_539_066_60e-27, Dimension::MASS));
        self.insert(&["lb", "pound"], UnitDef::fixed(0.453_592_37, Dimension::MASS));

        // Time
        self.insert(&["min", "minute"], UnitDef::fixed(60.0, Dimension::TIME));
        self.insert(&["h", "hr", "hour"], UnitDef::fixed(3600.0, Dimension::TIME));
        self.insert(&["d", "day"], UnitDef::fixed(86_400.0, Dimension::TIME));

        // Temperature scales
        self.insert(&["degC", "°C", "celsius", "degree_Celsius"], UnitDef::affine(1.0, 273.15));
        self.insert(
            &["degF", "°F", "fahrenheit", "degree_Fahrenheit"],
            UnitDef::affine(5.0 / 9.0, 459.67 * 5.0 / 9.0),
        );
        self.insert(&["degR", "rankine"], UnitDef::fixed(5.0 / 9.0, Dimension::TEMPERATURE));

        // Derived SI units
        self.insert(&["Hz", "hertz"], UnitDef::linear(1.0, frequency));
        self.insert(&["N", "newton"], UnitDef::linear(1.0, force));
        self.insert(&["Pa", "pascal"], UnitDef::linear(1.0, pressure));
        self.insert(&["bar"], UnitDef::linear(1e5, pressure));
        self.insert(&["atm", "atmosphere"], UnitDef::fixed(101_325.0, pressure));
        self.insert(&["Torr", "torr"], UnitDef::linear(101_325.0 / 760.0, pressure));
        self.insert(&["J", "joule"], UnitDef::linear(1.0, energy));
        self.insert(&["eV", "electron_volt"], UnitDef::linear(1.602_176_634e-19, energy));
        self.insert(&["W", "watt"], UnitDef::linear(1.0, power));
        self.insert(&["C", "coulomb"], UnitDef::linear(1.0, charge));
        self.insert(&["V", "volt"], UnitDef::linear(1.0, voltage));
        self.insert(&["ohm", "Ω"], UnitDef::linear(1.0, resistance));
        self.insert(&["L", "l", "liter", "litre"], UnitDef::linear(1e-3, volume));

        // Dimensionless
        self.insert(&["rad", "radian"], UnitDef::linear(1.0, none));
        self.insert(&["deg", "degree", "°"], UnitDef::fixed(PI / 180.0, none));
        self.insert(&["sr", "steradian"], UnitDef::linear(1.0, none));
        self.insert(&["percent", "%"], UnitDef::fixed(0.01, none));
        self.insert(&["ppm"], UnitDef::fixed(1e-6, none));
        self.insert(&["count", "counts", "ct"], UnitDef::fixed(1.0, none));

        // Detector pixel pitches
        self.insert(
            &["eigerpixel", "eigerpixels", "eigerpx"],
            UnitDef::fixed(0.075e-3, Dimension::LENGTH),
        );
        self.insert(
            &["pilatuspixel", "pilatuspixels", "pilatuspx"],
            UnitDef::fixed(0.172e-3, Dimension::LENGTH),
        );
    }

    /// Define a new linear unit as `factor * base_expression`.
    ///
    /// ```
    /// use treetrans::units::UnitRegistry;
    ///
    /// let mut registry = UnitRegistry::new();
    /// registry.define(&["mythenpixel", "mythenpx"], 0.05, "mm").unwrap();
    /// let conv = registry.conversion("mythenpx", "um").unwrap();
    /// assert!((conv.scale() - 50.0).abs() < 1e-9);
    /// ```
    pub fn define(
        &mut self,
        names: &[&str],
        factor: f64,
        base_expression: &str,
    ) -> Result<(), UnitError> {
        let base = self.resolve(base_expression)?;
        if base.offset != 0.0 {
            return Err(UnitError::OffsetCompound {
                unit: base_expression.to_string(),
            });
        }
        self.insert(names, UnitDef::fixed(factor * base.scale, base.dimension));
        Ok(())
    }

    /// Check if a symbol resolves to a unit.
    pub fn contains(&self, symbol: &str) -> bool {
        self.lookup_symbol(symbol).is_some()
    }

    fn lookup_symbol(&self, symbol: &str) -> Option<UnitDef> {
        if let Some(def) = self.units.get(symbol) {
            return Some(*def);
        }
        for (prefix, factor) in PREFIXES {
            if let Some(rest) = symbol.strip_prefix(prefix) {
                if rest.is_empty() {
                    continue;
                }
                if let Some(def) = self.units.get(rest).filter(|d| d.prefixable) {
                    return Some(UnitDef {
                        scale: def.scale * factor,
                        ..*def
                    });
                }
            }
        }
        symbol
            .strip_suffix('s')
            .filter(|singular| singular.len() > 2)
            .and_then(|singular| self.lookup_symbol(singular))
    }

    /// Resolve a unit expression to its SI scale, offset and dimension.
    pub fn resolve(&self, expression: &str) -> Result<ResolvedUnit, UnitError> {
        let terms = parse_expression(expression)?;
        let mut scale = 1.0;
        let mut dimension = Dimension::NONE;
        let mut offset = 0.0;

        for term in &terms {
            let def = self
                .lookup_symbol(&term.symbol)
                .ok_or_else(|| UnitError::Unknown {
                    symbol: term.symbol.clone(),
                    unit: expression.to_string(),
                })?;
            if def.offset != 0.0 {
                if terms.len() != 1 || term.exponent != 1 {
                    return Err(UnitError::OffsetCompound {
                        unit: expression.to_string(),
                    });
                }
                offset = def.offset;
            }
            scale *= def.scale.powi(term.exponent);
            dimension = def
                .dimension
                .checked_powi(term.exponent)
                .and_then(|d| dimension.checked_mul(d))
                .ok_or_else(|| UnitError::Parse {
                    unit: expression.to_string(),
                    message: format!("exponent of '{}' is out of range", term.symbol),
                })?;
        }

        Ok(ResolvedUnit {
            scale,
            offset,
            dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_of(expr: &str) -> f64 {
        UnitRegistry::shared().resolve(expr).unwrap().scale
    }

    #[test]
    fn test_prefixes() {
        assert!((scale_of("mm") - 1e-3).abs() < 1e-18);
        assert!((scale_of("kg") - 1.0).abs() < 1e-12);
        assert!((scale_of("nm") - 1e-9).abs() < 1e-24);
        assert!((scale_of("µm") - 1e-6).abs() < 1e-21);
        assert!((scale_of("keV") - 1.602_176_634e-16).abs() < 1e-28);
        assert!((scale_of("hPa") - 100.0).abs() < 1e-9);
        assert!((scale_of("millimeter") - 1e-3).abs() < 1e-18);
    }

    #[test]
    fn test_exact_names_win_over_prefixes() {
        assert_eq!(scale_of("min"), 60.0);
        assert_eq!(scale_of("cd"), 1.0);
        assert_eq!(scale_of("Pa"), 1.0);
    }

    #[test]
    fn test_plural() {
        assert_eq!(scale_of("meters"), 1.0);
        assert!((scale_of("eigerpixels") - 7.5e-5).abs() < 1e-18);
    }

    #[test]
    fn test_dimensions() {
        let registry = UnitRegistry::shared();
        assert_eq!(registry.resolve("mm").unwrap().dimension, Dimension::LENGTH);
        assert_eq!(
            registry.resolve("N").unwrap().dimension,
            registry.resolve("kg*m/s^2").unwrap().dimension
        );
        assert!(registry.resolve("rad").unwrap().dimension.is_dimensionless());
        assert_eq!(
            registry.resolve("1/nm").unwrap().dimension.to_string(),
            "[length]^-1"
        );
    }

    #[test]
    fn test_offset_units_must_stand_alone() {
        let registry = UnitRegistry::shared();
        assert!(registry.resolve("degC").is_ok());
        assert!(matches!(
            registry.resolve("degC/s"),
            Err(UnitError::OffsetCompound { .. })
        ));
        assert!(registry.resolve("mdegC").is_err());
    }

    #[test]
    fn test_unknown_symbol() {
        let err = UnitRegistry::shared().resolve("furlong").unwrap_err();
        assert!(matches!(err, UnitError::Unknown { .. }));
    }

    #[test]
    fn test_exponent_overflow_is_rejected() {
        let registry = UnitRegistry::shared();
        assert!(matches!(
            registry.conversion("m^100*m^100", "m"),
            Err(UnitError::Parse { .. })
        ));
        assert!(matches!(
            registry.conversion("m^256", "rad"),
            Err(UnitError::Parse { .. })
        ));
        assert!(matches!(
            registry.resolve("(m^64)^4"),
            Err(UnitError::Parse { .. })
        ));
        assert_eq!(
            registry.resolve("m^100/m^100").unwrap().dimension,
            Dimension::NONE
        );
    }

    #[test]
    fn test_define() {
        let mut registry = UnitRegistry::new();
        registry.define(&["smoot"], 1.7018, "m").unwrap();
        assert!((registry.resolve("smoot").unwrap().scale - 1.7018).abs() < 1e-12);
        assert!(registry.define(&["bad"], 1.0, "degC").is_err());
    }
}
