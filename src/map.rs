//! Bridges visible incidents to a map widget. Only the explicit movers change
//! the viewport.

use log::{log, Level};

use crate::{
    format::format_date,
    schema::model::Incident,
    taxonomy::Status,
};

pub const DEFAULT_ZOOM: u8 = 13;
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 19;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub incident_id: u64,
    pub position: LatLng,
    pub status: Status,
    pub css_class: &'static str,
    pub color: &'static str,
}

impl Marker {
    pub const ICON_SIZE: (u16, u16) = (24, 24);
    pub const ICON_ANCHOR: (i16, i16) = (12, 24);
    pub const POPUP_ANCHOR: (i16, i16) = (0, -20);

    pub fn for_incident(incident: &Incident) -> Self {
        Self {
            incident_id: incident.id,
            position: LatLng {
                lat: incident.latitude,
                lng: incident.longitude,
            },
            status: incident.status,
            css_class: incident.status.marker_class(),
            color: incident.status.marker_color(),
        }
    }
}

/// Card content shown inside a marker popup.
#[derive(Clone, Debug, PartialEq)]
pub struct PopupSummary {
    pub incident_id: u64,
    pub title: String,
    pub category_label: &'static str,
    pub status_label: &'static str,
    pub address: String,
    pub date: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub comments_count: u32,
}

impl PopupSummary {
    pub fn of(incident: &Incident) -> Self {
        Self {
            incident_id: incident.id,
            title: incident.title.clone(),
            category_label: incident.category.label(),
            status_label: incident.status.label(),
            address: incident.address.clone(),
            date: format_date(incident.created_at),
            upvotes: incident.upvotes,
            downvotes: incident.downvotes,
            comments_count: incident.comments_count,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupOptions {
    pub auto_pan: bool,
    pub keep_in_view: bool,
    pub close_button: bool,
    pub min_width: u16,
    pub max_width: u16,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            auto_pan: false,
            keep_in_view: false,
            close_button: false,
            min_width: 280,
            max_width: 280,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapOptions {
    pub initial_viewport: Viewport,
    pub popup: PopupOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

pub trait MapSurface {
    fn clear_markers(&mut self);
    fn place_marker(&mut self, marker: &Marker);
    fn show_popup(&mut self, marker: &Marker, summary: &PopupSummary, options: &PopupOptions);
    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);
}

pub trait SelectionListener {
    fn incident_selected(&mut self, incident: &Incident);
}

impl<F: FnMut(&Incident)> SelectionListener for F {
    fn incident_selected(&mut self, incident: &Incident) {
        self(incident)
    }
}

pub struct MapAdapter<S: MapSurface> {
    surface: S,
    options: MapOptions,
    visible: Vec<(Incident, Marker)>,
    show_legend: bool,
}

impl<S: MapSurface> MapAdapter<S> {
    pub fn new(mut surface: S, options: MapOptions) -> Self {
        surface.set_viewport(options.initial_viewport);
        Self {
            surface,
            options,
            visible: Vec::new(),
            show_legend: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.visible.iter().map(|(_, marker)| marker)
    }

    /// Replaces the markers with one per incident, in the given order.
    pub fn render<'a>(&mut self, incidents: impl IntoIterator<Item = &'a Incident>) {
        self.surface.clear_markers();
        self.visible = incidents
            .into_iter()
            .map(|incident| (incident.clone(), Marker::for_incident(incident)))
            .collect();
        for (_, marker) in &self.visible {
            self.surface.place_marker(marker);
        }
        log!(Level::Debug, "Rendered {} markers", self.visible.len());
    }

    /// Handles a click on a marker: notifies the host, opens the popup and keeps
    /// the viewport where the viewer left it.
    pub fn activate(
        &mut self,
        incident_id: u64,
        listener: &mut impl SelectionListener,
    ) -> Option<PopupSummary> {
        let (incident, marker) = self
            .visible
            .iter()
            .find(|(incident, _)| incident.id == incident_id)?;
        listener.incident_selected(incident);

        let summary = PopupSummary::of(incident);
        let before = self.surface.viewport();
        self.surface
            .show_popup(marker, &summary, &self.options.popup);
        if self.surface.viewport() != before {
            log!(
                Level::Debug,
                "Popup for incident {incident_id} moved the map, restoring viewport"
            );
            self.surface.set_viewport(before);
        }
        Some(summary)
    }

    pub fn pan_to(&mut self, center: LatLng) {
        let zoom = self.surface.viewport().zoom;
        self.surface.set_viewport(Viewport { center, zoom });
    }

    pub fn zoom_in(&mut self) {
        let mut viewport = self.surface.viewport();
        viewport.zoom = viewport.zoom.saturating_add(1).min(MAX_ZOOM);
        self.surface.set_viewport(viewport);
    }

    pub fn zoom_out(&mut self) {
        let mut viewport = self.surface.viewport();
        viewport.zoom = viewport.zoom.saturating_sub(1).max(MIN_ZOOM);
        self.surface.set_viewport(viewport);
    }

    pub fn recenter(&mut self) {
        self.surface.set_viewport(Viewport {
            center: self.options.initial_viewport.center,
            zoom: DEFAULT_ZOOM,
        });
    }

    pub fn toggle_legend(&mut self) -> bool {
        self.show_legend = !self.show_legend;
        self.show_legend
    }

    pub fn legend_visible(&self) -> bool {
        self.show_legend
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        Status::ALL
            .iter()
            .map(|status| LegendEntry {
                label: status.label(),
                color: status.marker_color(),
            })
            .collect()
    }
}
