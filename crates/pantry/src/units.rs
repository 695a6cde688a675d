//! Unit normalization and conversion over the `global_unit_conversions` table.

use rusqlite::Connection;

use crate::db::conversion_repo;
use crate::error::{LedgerWarning, PantryError, Result};

/// Spellings folded onto the short unit names used in the seeded table.
const UNIT_SPELLINGS: &[(&str, &str)] = &[
    ("gram", "g"),
    ("grams", "g"),
    ("gr", "g"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("kgs", "kg"),
    ("milligram", "mg"),
    ("milligrams", "mg"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("lbs", "lb"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("liter", "l"),
    ("liters", "l"),
    ("litre", "l"),
    ("litres", "l"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("centiliter", "cl"),
    ("centiliters", "cl"),
    ("deciliter", "dl"),
    ("deciliters", "dl"),
    ("gallon", "gal"),
    ("gallons", "gal"),
    ("quart", "qt"),
    ("quarts", "qt"),
    ("pint", "pt"),
    ("pints", "pt"),
    ("cups", "cup"),
    ("fluid ounce", "fl oz"),
    ("fluid ounces", "fl oz"),
    ("floz", "fl oz"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("tbs", "tbsp"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("piece", "pcs"),
    ("pieces", "pcs"),
    ("pc", "pcs"),
    ("item", "pcs"),
    ("items", "pcs"),
    ("each", "pcs"),
];

/// Lowercases, trims, collapses whitespace and folds common spellings.
pub fn normalize_unit(unit: &str) -> String {
    let collapsed = unit.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    UNIT_SPELLINGS
        .iter()
        .find(|(spelling, _)| *spelling == collapsed)
        .map(|(_, short)| short.to_string())
        .unwrap_or(collapsed)
}

/// Outcome of converting a quantity into a target unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub quantity: f64,
    /// Set when no factor was found and `quantity` is the unconverted input.
    pub warning: Option<LedgerWarning>,
}

/// Converts `quantity` from `from` into `to`.
///
/// Tries the direct factor, then the inverse of the reverse factor. With
/// neither, the quantity is returned unchanged together with a
/// `ConversionUnavailable` warning.
pub fn convert(conn: &Connection, quantity: f64, from: &str, to: &str) -> Result<Conversion> {
    let from = normalize_unit(from);
    let to = normalize_unit(to);

    if from == to {
        return Ok(Conversion {
            quantity,
            warning: None,
        });
    }

    if let Some(factor) = conversion_repo::find_factor(conn, &from, &to)? {
        return Ok(Conversion {
            quantity: quantity * factor,
            warning: None,
        });
    }

    if let Some(factor) = conversion_repo::find_factor(conn, &to, &from)? {
        return Ok(Conversion {
            quantity: quantity / factor,
            warning: None,
        });
    }

    tracing::warn!(%from, %to, "no unit conversion available, using quantity as-is");
    Ok(Conversion {
        quantity,
        warning: Some(LedgerWarning::ConversionUnavailable { from, to }),
    })
}

/// Like [`convert`] but refuses to fall back.
pub fn convert_strict(conn: &Connection, quantity: f64, from: &str, to: &str) -> Result<f64> {
    let conversion = convert(conn, quantity, from, to)?;
    match conversion.warning {
        None => Ok(conversion.quantity),
        Some(_) => Err(PantryError::invalid(format!(
            "no conversion between '{}' and '{}'",
            normalize_unit(from),
            normalize_unit(to)
        ))),
    }
}

/// Registers a directed factor (`qty_to = qty_from * factor`).
///
/// Registered factors are fixed: logged quantities in other units are
/// projected through them, so changing one would rewrite history. Repeating
/// an existing registration (directly or as its reverse) is accepted only
/// with the same factor.
pub fn register_conversion(conn: &Connection, from: &str, to: &str, factor: f64) -> Result<()> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(PantryError::invalid(format!(
            "conversion factor must be a positive number, got {}",
            factor
        )));
    }
    let from = normalize_unit(from);
    let to = normalize_unit(to);
    if from.is_empty() || to.is_empty() || from == to {
        return Err(PantryError::invalid(
            "conversion needs two distinct, non-empty units",
        ));
    }
    let existing = match conversion_repo::find_factor(conn, &from, &to)? {
        Some(direct) => Some(direct),
        None => conversion_repo::find_factor(conn, &to, &from)?.map(|reverse| 1.0 / reverse),
    };
    match existing {
        Some(current) if same_factor(current, factor) => Ok(()),
        Some(current) => Err(PantryError::invalid(format!(
            "conversion '{}' -> '{}' is already registered with factor {}",
            from, to, current
        ))),
        None => {
            conversion_repo::insert(conn, &from, &to, factor)?;
            tracing::info!(%from, %to, factor, "unit conversion registered");
            Ok(())
        }
    }
}

fn same_factor(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit(" Grams "), "g");
        assert_eq!(normalize_unit("Fluid   Ounces"), "fl oz");
        assert_eq!(normalize_unit("KG"), "kg");
        assert_eq!(normalize_unit("jar"), "jar");
    }

    #[test]
    fn test_direct_and_inverse_factors() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let direct = convert(conn, 1.5, "kg", "g")?;
            assert!(approx(direct.quantity, 1500.0));
            assert!(direct.warning.is_none());

            let inverse = convert(conn, 250.0, "grams", "kilograms")?;
            assert!(approx(inverse.quantity, 0.25));
            assert!(inverse.warning.is_none());

            let same = convert(conn, 3.0, "Cups", "cup")?;
            assert_eq!(same.quantity, 3.0);
            Ok::<_, PantryError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_missing_factor_falls_back_with_warning() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let fallback = convert(conn, 2.0, "cup", "g")?;
            assert_eq!(fallback.quantity, 2.0);
            assert_eq!(
                fallback.warning,
                Some(LedgerWarning::ConversionUnavailable {
                    from: "cup".to_string(),
                    to: "g".to_string()
                })
            );
            assert!(convert_strict(conn, 2.0, "cup", "g").is_err());
            Ok::<_, PantryError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_register_conversion() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            register_conversion(conn, "Cans", "g", 400.0)?;
            assert!(approx(convert(conn, 2.0, "cans", "g")?.quantity, 800.0));
            assert!(approx(convert(conn, 200.0, "g", "cans")?.quantity, 0.5));

            // Same factor again, directly or as the reverse, is a no-op.
            register_conversion(conn, "cans", "g", 400.0)?;
            register_conversion(conn, "g", "cans", 0.0025)?;
            assert!(matches!(
                register_conversion(conn, "cans", "g", 500.0),
                Err(PantryError::InvalidOperation(_))
            ));
            assert!(matches!(
                register_conversion(conn, "g", "kg", 0.002),
                Err(PantryError::InvalidOperation(_))
            ));
            assert!(approx(convert(conn, 2.0, "cans", "g")?.quantity, 800.0));

            assert!(register_conversion(conn, "g", "g", 1.0).is_err());
            assert!(register_conversion(conn, "jar", "g", 0.0).is_err());
            assert!(register_conversion(conn, "jar", "g", f64::NAN).is_err());
            Ok::<_, PantryError>(())
        })
        .unwrap();
    }
}
