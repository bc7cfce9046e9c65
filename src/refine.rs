// Copyright (C) 2025 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Exact geometric filtering of the records of a bounding box query.

use crate::{
    geometry::{self, PreparedGeometry},
    pagination::Page,
    Error, Result,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Decides whether a record is kept.
pub type RecordPredicate = Box<dyn Fn(&Value) -> Result<bool>>;

/// Whether the geometry of a record intersects the prepared geometry.
///
/// Records without a geometry are not kept.
pub fn intersects_record(prepared: &PreparedGeometry, record: &Value) -> Result<bool> {
    match geometry::record_geometry(record) {
        Ok(Some(record_geometry)) => Ok(prepared.intersects(&record_geometry)),
        Ok(None) => {
            warn!("Dropping a record without geometry: {}", record_id(record));
            Ok(false)
        }
        Err(reason) => Err(Error::malformed(
            record_id(record),
            format!("invalid record geometry: {}", reason),
        )),
    }
}

fn record_id(record: &Value) -> String {
    ["onestop_id", "id"]
        .iter()
        .filter_map(|key| {
            record
                .get(key)
                .or_else(|| record.get("properties").and_then(|p| p.get(key)))
        })
        .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
        .next()
        .unwrap_or_else(|| "<unidentified record>".to_string())
}

/// Predicate keeping the records which intersect `prepared`.
pub fn intersection_predicate(prepared: PreparedGeometry) -> RecordPredicate {
    Box::new(move |record| intersects_record(&prepared, record))
}

/// Keep the records of a page accepted by the predicate, in order.
pub fn refine_page(predicate: &dyn Fn(&Value) -> Result<bool>, page: Page) -> Result<Page> {
    let received = page.len();
    let mut kept = Vec::with_capacity(received);
    for record in page {
        if predicate(&record)? {
            kept.push(record);
        }
    }
    debug!("Kept {} of {} records", kept.len(), received);
    Ok(kept)
}

/// Pages of a query, refined by a predicate when there is one.
///
/// Every incoming page gives exactly one outgoing page, possibly empty.
pub struct RefinedPages<I> {
    pages: I,
    predicate: Option<RecordPredicate>,
}

impl<I> RefinedPages<I> {
    /// Refine `pages` with `predicate`, or pass them through when `None`.
    pub fn new(pages: I, predicate: Option<RecordPredicate>) -> Self {
        RefinedPages { pages, predicate }
    }

    /// `true` when pages are filtered.
    pub fn is_refining(&self) -> bool {
        self.predicate.is_some()
    }
}

impl<I> Iterator for RefinedPages<I>
where
    I: Iterator<Item = Result<Page>>,
{
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.pages.next()?;
        Some(page.and_then(|page| match &self.predicate {
            Some(predicate) => refine_page(&**predicate, page),
            None => Ok(page),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stop(id: &str, lon: f64, lat: f64) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [lon, lat]},
            "properties": {"onestop_id": id}
        })
    }

    fn unit_square() -> PreparedGeometry {
        let square: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]
        .into();
        PreparedGeometry::new(&square).unwrap()
    }

    #[test]
    fn keeps_intersecting_records_in_order() {
        let page = vec![
            stop("s-out-1", 2.0, 2.0),
            stop("s-in-1", 0.5, 0.5),
            stop("s-out-2", -0.5, 0.5),
            stop("s-in-2", 0.9, 0.1),
            stop("s-out-3", 1.5, -1.0),
        ];
        let predicate = intersection_predicate(unit_square());
        let refined = refine_page(&*predicate, page).unwrap();
        assert_eq!(refined, vec![stop("s-in-1", 0.5, 0.5), stop("s-in-2", 0.9, 0.1)]);
    }

    #[test]
    fn empty_pages_are_still_yielded() {
        let pages: Vec<Result<Page>> = vec![
            Ok(vec![stop("s-out", 5.0, 5.0)]),
            Ok(vec![stop("s-in", 0.5, 0.5)]),
        ];
        let refined: Vec<Page> = RefinedPages::new(
            pages.into_iter(),
            Some(intersection_predicate(unit_square())),
        )
        .collect::<Result<_>>()
        .unwrap();
        assert_eq!(refined, vec![vec![], vec![stop("s-in", 0.5, 0.5)]]);
    }

    #[test]
    fn pages_pass_through_without_predicate() {
        let pages: Vec<Result<Page>> = vec![Ok(vec![stop("s-far", 50.0, 50.0)])];
        let refined = RefinedPages::new(pages.into_iter(), None);
        assert!(!refined.is_refining());
        let refined: Vec<Page> = refined.collect::<Result<_>>().unwrap();
        assert_eq!(refined, vec![vec![stop("s-far", 50.0, 50.0)]]);
    }

    #[test]
    fn record_without_geometry_is_dropped() {
        let record = json!({"type": "Feature", "geometry": null, "properties": {}});
        assert!(!intersects_record(&unit_square(), &record).unwrap());
    }

    #[test]
    fn invalid_record_geometry_is_a_protocol_error() {
        let record = json!({
            "geometry": {"type": "Polygon", "coordinates": 12},
            "properties": {"onestop_id": "s-broken"}
        });
        let err = intersects_record(&unit_square(), &record).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Protocol);
        assert!(err.to_string().contains("s-broken"));
    }

    #[test]
    fn errors_are_forwarded() {
        let pages: Vec<Result<Page>> = vec![Err(Error::malformed("http://api", "boom"))];
        let mut refined = RefinedPages::new(
            pages.into_iter(),
            Some(intersection_predicate(unit_square())),
        );
        assert!(refined.next().unwrap().is_err());
        assert!(refined.next().is_none());
    }
}
