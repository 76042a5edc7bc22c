//! Row-to-entity hydration
//!
//! Columns are matched to properties by name. Null cells and columns with
//! no matching property are skipped, as are properties without a setter;
//! untouched properties keep their default values.

use crate::backends::Row;
use crate::error::OrmResult;
use crate::model::{self, Entity, EntityDescriptor};

pub fn hydrate_into(
    row: &Row,
    descriptor: &EntityDescriptor,
    entity: &mut dyn Entity,
) -> OrmResult<()> {
    for (column, value) in row.iter() {
        if value.is_null() {
            continue;
        }
        if let Some(property) = descriptor.property(column) {
            if property.has_setter() {
                property.set(entity, value.clone())?;
            }
        }
    }
    Ok(())
}

/// Hydrate one entity from a row
pub fn hydrate<M: Entity + Default>(row: &Row) -> OrmResult<M> {
    let descriptor = model::descriptor(M::entity_type())?;
    let mut entity = M::default();
    hydrate_into(row, &descriptor, &mut entity)?;
    Ok(entity)
}

/// Hydrate every row, preserving row order
pub fn hydrate_all<M: Entity + Default>(rows: &[Row]) -> OrmResult<Vec<M>> {
    let descriptor = model::descriptor(M::entity_type())?;
    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        let mut entity = M::default();
        hydrate_into(row, &descriptor, &mut entity)?;
        entities.push(entity);
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_entity;
    use crate::model::{from_value, register_entity, to_value, DescriptorBuilder};
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Sample {
        a: i64,
        c: String,
    }

    impl_entity!(Sample, "HydrationTestSample");

    static REGISTERED: Lazy<()> = Lazy::new(|| {
        register_entity(
            DescriptorBuilder::<Sample>::new()
                .column(
                    "A",
                    |s| to_value(&s.a),
                    |s, v| {
                        s.a = from_value(v)?;
                        Ok(())
                    },
                )
                .column(
                    "C",
                    |s| to_value(&s.c),
                    |s, v| {
                        s.c = from_value(v)?;
                        Ok(())
                    },
                )
                .build(),
        )
        .unwrap();
    });

    #[test]
    fn test_unmatched_columns_ignored() {
        Lazy::force(&REGISTERED);
        let row = Row::new().with("A", 7).with("B", "ignored").with("C", "hello");
        let sample: Sample = hydrate(&row).unwrap();
        assert_eq!(sample, Sample { a: 7, c: "hello".to_string() });
    }

    #[test]
    fn test_null_cells_leave_defaults() {
        Lazy::force(&REGISTERED);
        let row = Row::new().with("A", Value::Null).with("C", "set");
        let sample: Sample = hydrate(&row).unwrap();
        assert_eq!(sample.a, 0);
        assert_eq!(sample.c, "set");
    }

    #[test]
    fn test_hydrate_all_preserves_order() {
        Lazy::force(&REGISTERED);
        let rows = vec![
            Row::new().with("A", 1),
            Row::new().with("A", 2),
            Row::new().with("A", 3),
        ];
        let samples: Vec<Sample> = hydrate_all(&rows).unwrap();
        let ids: Vec<i64> = samples.iter().map(|s| s.a).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_type_mismatch_surfaces() {
        Lazy::force(&REGISTERED);
        let row = Row::new().with("A", json!("not a number"));
        assert!(hydrate::<Sample>(&row).is_err());
    }
}
