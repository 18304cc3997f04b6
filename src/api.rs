//! Viewport query surface for map clients.
//!
//! A map page asks for the clusters visible in its viewport at its current
//! zoom and receives them as JSON tuples of
//! `[longitude, latitude, count, detail_link_or_null]`.

use crate::compute::validation::{parse_coordinate, parse_zoom, validate_viewport, validate_zoom};
use crate::config::{ClusterPoint, Config, EntityId, Viewport};
use crate::error::Result;
use crate::storage::ClusterStore;
use serde::{Deserialize, Serialize};

/// Renders the detail link of a degenerate cluster.
pub trait DetailLinker {
    fn link(&self, id: &EntityId) -> Option<String>;
}

impl<F> DetailLinker for F
where
    F: Fn(&EntityId) -> Option<String>,
{
    fn link(&self, id: &EntityId) -> Option<String> {
        self(id)
    }
}

/// Link built by substituting `{id}` in a URL template.
///
/// ```
/// use geocluster::api::{DetailLinker, LinkTemplate};
/// use geocluster::EntityId;
///
/// let linker = LinkTemplate::new("/people/{id}/");
/// assert_eq!(linker.link(&EntityId::from("simon")).as_deref(), Some("/people/simon/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    template: String,
}

impl LinkTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.detail_link_template.clone())
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl DetailLinker for LinkTemplate {
    fn link(&self, id: &EntityId) -> Option<String> {
        Some(self.template.replace("{id}", &id.to_string()))
    }
}

/// Renders no links at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl DetailLinker for NoLinks {
    fn link(&self, _id: &EntityId) -> Option<String> {
        None
    }
}

/// One marker as sent to the map: `[longitude, latitude, count, link]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow(pub f64, pub f64, pub u32, pub Option<String>);

impl ClusterRow {
    pub fn from_cluster<L: DetailLinker + ?Sized>(cluster: &ClusterPoint, linker: &L) -> Self {
        let link = cluster
            .entity
            .as_ref()
            .filter(|_| cluster.is_degenerate())
            .and_then(|id| linker.link(id));
        Self(cluster.longitude(), cluster.latitude(), cluster.count, link)
    }

    pub fn longitude(&self) -> f64 {
        self.0
    }

    pub fn latitude(&self) -> f64 {
        self.1
    }

    pub fn count(&self) -> u32 {
        self.2
    }

    pub fn link(&self) -> Option<&str> {
        self.3.as_deref()
    }
}

/// A validated viewport query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRequest {
    pub zoom: u8,
    pub viewport: Viewport,
}

impl ViewportRequest {
    pub fn new(zoom: u8, viewport: Viewport) -> Result<Self> {
        validate_zoom(zoom)?;
        validate_viewport(&viewport)?;
        Ok(Self { zoom, viewport })
    }

    /// Parse raw request parameters.
    ///
    /// Non-numeric or out-of-range values are client errors. A reversed
    /// south/north pair is accepted and swapped; `west > east` means the
    /// viewport crosses the antimeridian.
    ///
    /// ```
    /// use geocluster::api::ViewportRequest;
    ///
    /// let request = ViewportRequest::parse("170", "10", "-170", "-10", "3").unwrap();
    /// assert!(request.viewport.crosses_antimeridian());
    /// assert_eq!(request.viewport.south, -10.0);
    ///
    /// let err = ViewportRequest::parse("west", "0", "10", "10", "3").unwrap_err();
    /// assert!(err.is_client_error());
    /// ```
    pub fn parse(west: &str, south: &str, east: &str, north: &str, zoom: &str) -> Result<Self> {
        let viewport = Viewport::new(
            parse_coordinate("west", west)?,
            parse_coordinate("south", south)?,
            parse_coordinate("east", east)?,
            parse_coordinate("north", north)?,
        );
        Self::new(parse_zoom(zoom)?, viewport)
    }
}

/// Rows visible in the requested viewport, in persisted order.
pub fn query_rows<S, L>(store: &S, request: &ViewportRequest, linker: &L) -> Result<Vec<ClusterRow>>
where
    S: ClusterStore + ?Sized,
    L: DetailLinker + ?Sized,
{
    let clusters = store.query(request.zoom, &request.viewport)?;
    log::debug!(
        "viewport query at zoom {} returned {} clusters",
        request.zoom,
        clusters.len()
    );
    Ok(clusters
        .iter()
        .map(|cluster| ClusterRow::from_cluster(cluster, linker))
        .collect())
}

/// The JSON response body for a viewport query.
pub fn query_json<S, L>(store: &S, request: &ViewportRequest, linker: &L) -> Result<String>
where
    S: ClusterStore + ?Sized,
    L: DetailLinker + ?Sized,
{
    let rows = query_rows(store, request, linker)?;
    Ok(serde_json::to_string(&rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClusterSet, MemoryStore};

    fn store() -> MemoryStore {
        let mut set = ClusterSet::new();
        set.insert_level(
            2,
            vec![
                ClusterPoint::new(2, 51.5, -0.12, 1, Some(EntityId::from("ada"))),
                ClusterPoint::new(2, 48.85, 2.35, 14, None),
                ClusterPoint::new(2, -33.9, 151.2, 3, None),
            ],
        );
        let store = MemoryStore::new();
        store.replace_all(set).unwrap();
        store
    }

    #[test]
    fn test_rows_render_as_tuples() {
        let request = ViewportRequest::parse("-10", "40", "10", "60", "2").unwrap();
        let json = query_json(&store(), &request, &LinkTemplate::new("/people/{id}/")).unwrap();
        assert_eq!(json, r#"[[-0.12,51.5,1,"/people/ada/"],[2.35,48.85,14,null]]"#);
    }

    #[test]
    fn test_linker_from_config() {
        let linker = LinkTemplate::from_config(&Config::default());
        assert_eq!(linker.link(&EntityId::from(42)).as_deref(), Some("/people/42/"));
    }

    #[test]
    fn test_closure_linker_and_no_links() {
        let request = ViewportRequest::new(2, Viewport::world()).unwrap();
        let store = store();

        let rows = query_rows(&store, &request, &NoLinks).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.link().is_none()));

        let shout = |id: &EntityId| Some(format!("#{}", id));
        let rows = query_rows(&store, &request, &shout).unwrap();
        assert_eq!(rows[0].link(), Some("#ada"));
        assert_eq!(rows[1].link(), None);
    }

    #[test]
    fn test_aggregate_rows_never_link() {
        let mut aggregate = ClusterPoint::new(1, 0.0, 0.0, 5, None);
        aggregate.entity = Some(EntityId::from(3));
        let row = ClusterRow::from_cluster(&aggregate, &LinkTemplate::new("/{id}"));
        assert_eq!(row.link(), None);
        assert_eq!(row.count(), 5);
    }

    #[test]
    fn test_parse_rejects_bad_parameters() {
        assert!(ViewportRequest::parse("a", "0", "1", "1", "3").unwrap_err().is_client_error());
        assert!(ViewportRequest::parse("0", "0", "1", "1", "x").unwrap_err().is_client_error());
        assert!(ViewportRequest::parse("0", "0", "1", "1", "31").unwrap_err().is_client_error());
        assert!(ViewportRequest::parse("0", "0", "190", "1", "3").unwrap_err().is_client_error());
        assert!(ViewportRequest::parse("0", "-91", "1", "1", "3").unwrap_err().is_client_error());
        assert!(ViewportRequest::parse("NaN", "0", "1", "1", "3").unwrap_err().is_client_error());
    }

    #[test]
    fn test_parse_swaps_reversed_latitudes() {
        let request = ViewportRequest::parse(" -10 ", "60", "10", "40", "2").unwrap();
        assert_eq!(request.viewport.south, 40.0);
        assert_eq!(request.viewport.north, 60.0);
        assert_eq!(query_rows(&store(), &request, &NoLinks).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_zoom_is_empty_not_error() {
        let request = ViewportRequest::new(9, Viewport::world()).unwrap();
        assert_eq!(query_json(&store(), &request, &NoLinks).unwrap(), "[]");
    }
}
