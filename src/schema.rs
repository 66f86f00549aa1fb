use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::ColumnRole;

/// Role detection rules, evaluated in order. A column is assigned to a role
/// when its normalized name contains any of the role's keywords.
pub const RULES: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::Date, &["FECHA", "DATE"]),
    (ColumnRole::Product, &["PRODUCTO", "ITEM", "NOMBRE"]),
    (ColumnRole::Quantity, &["UNIDADES", "VENTA", "CANTIDAD", "QTY"]),
];

/// Position of a resolved column in the source header plus its normalized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHandle {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: ColumnHandle,
    pub product: ColumnHandle,
    pub quantity: ColumnHandle,
}

pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Resolve the date, product and quantity columns from raw header names.
/// First match in header order wins for each role.
pub fn resolve<I, S>(headers: I) -> Result<ColumnMapping>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized: Vec<String> = headers.into_iter().map(|h| normalize(h.as_ref())).collect();

    let find = |role: ColumnRole| -> Option<ColumnHandle> {
        let keywords = RULES.iter().find(|(r, _)| *r == role).map(|(_, k)| *k)?;
        normalized
            .iter()
            .position(|name| keywords.iter().any(|k| name.contains(k)))
            .map(|index| ColumnHandle {
                index,
                name: normalized[index].clone(),
            })
    };

    match (
        find(ColumnRole::Date),
        find(ColumnRole::Product),
        find(ColumnRole::Quantity),
    ) {
        (Some(date), Some(product), Some(quantity)) => {
            debug!(
                date = %date.name,
                product = %product.name,
                quantity = %quantity.name,
                "schema resolved"
            );
            Ok(ColumnMapping {
                date,
                product,
                quantity,
            })
        }
        _ => Err(AppError::SchemaResolution {
            available: normalized,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spanish_headers() {
        let m = resolve(["Fecha", "Producto", "Unidades Vendidas"]).unwrap();
        assert_eq!(m.date.index, 0);
        assert_eq!(m.product.index, 1);
        assert_eq!(m.quantity.index, 2);
        assert_eq!(m.quantity.name, "UNIDADES VENDIDAS");
    }

    #[test]
    fn resolves_english_headers_in_any_order() {
        let m = resolve(["qty", "item_code", "sale_date"]).unwrap();
        assert_eq!(m.date.index, 2);
        assert_eq!(m.product.index, 1);
        assert_eq!(m.quantity.index, 0);
    }

    #[test]
    fn invariant_to_case_and_whitespace() {
        let a = resolve(["  fecha ", "NOMBRE", " cantidad"]).unwrap();
        let b = resolve(["FECHA", "  nombre  ", "CANTIDAD"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_permutation_resolves_each_role_once() {
        let cols = ["Date", "Item", "Qty"];
        let perms = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for p in perms {
            let headers: Vec<&str> = p.iter().map(|&i| cols[i]).collect();
            let m = resolve(&headers).unwrap();
            assert_eq!(m.date.name, "DATE");
            assert_eq!(m.product.name, "ITEM");
            assert_eq!(m.quantity.name, "QTY");
            let mut idx = [m.date.index, m.product.index, m.quantity.index];
            idx.sort_unstable();
            assert_eq!(idx, [0, 1, 2], "headers={headers:?}");
        }
    }

    #[test]
    fn first_match_wins() {
        let m = resolve(["FECHA_ALTA", "FECHA_VENTA", "PRODUCTO", "CANTIDAD"]).unwrap();
        assert_eq!(m.date.name, "FECHA_ALTA");
        // FECHA_VENTA also contains VENTA and precedes CANTIDAD
        assert_eq!(m.quantity.name, "FECHA_VENTA");
    }

    #[test]
    fn missing_role_lists_available_columns() {
        let err = resolve(["Fecha", "Tienda", "Unidades"]).unwrap_err();
        match err {
            AppError::SchemaResolution { available } => {
                assert_eq!(available, vec!["FECHA", "TIENDA", "UNIDADES"]);
            }
            other => panic!("expected SchemaResolution, got {other:?}"),
        }
    }

    #[test]
    fn empty_header_fails() {
        let headers: Vec<String> = Vec::new();
        assert!(resolve(headers).is_err());
    }
}
