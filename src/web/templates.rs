//! HTML pages.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::AnalysisReport;
use crate::analytics::{filter_posts, sort_posts, PostSort, RoleFilter};
use crate::graph::{NodeClass, Palette};
use crate::constants::{PAN_STEP, ZOOM_STEP};
use crate::layout::{HoverCard, LayoutSnapshot, Pin, Spotlight, Viewport};

const PAGE_STYLE: &str = r"
body { background: #0f172a; color: #e2e8f0; }
svg.graph { background: #111827; border-radius: 8px; max-width: 100%; height: auto; }
svg.graph text { font-size: 11px; font-weight: 500; fill: #fff; pointer-events: none; }
.legend span { display: inline-block; margin-right: 1em; }
.swatch { display: inline-block; width: 0.8em; height: 0.8em; border-radius: 50%; margin-right: 0.3em; }
.hover-card { border-left: 4px solid #fbbf24; padding: 0.5em 1em; }
.muted { color: #94a3b8; }
";

/// Everything the graph page shows.
pub struct GraphView<'a> {
    pub url: &'a str,
    pub report: &'a AnalysisReport,
    pub snapshot: &'a LayoutSnapshot,
    pub spotlight: &'a Spotlight,
    pub hover_card: Option<&'a HoverCard>,
    pub palette: Palette,
    pub filter: RoleFilter,
    pub sort: PostSort,
    pub viewport: Viewport,
    pub pins: &'a [Pin],
}

impl GraphView<'_> {
    fn href(&self, hover: Option<&str>, filter: RoleFilter, sort: PostSort) -> String {
        self.link(hover, filter, sort, self.viewport, self.pins)
    }

    /// Same view under another viewport, keeping the hover.
    fn viewport_href(&self, viewport: Viewport) -> String {
        self.link(self.hovered(), self.filter, self.sort, viewport, self.pins)
    }

    /// Same view with another set of held nodes.
    fn pins_href(&self, pins: &[Pin]) -> String {
        self.link(self.hovered(), self.filter, self.sort, self.viewport, pins)
    }

    fn hovered(&self) -> Option<&str> {
        self.hover_card.map(|card| card.user.as_str())
    }

    fn link(
        &self,
        hover: Option<&str>,
        filter: RoleFilter,
        sort: PostSort,
        viewport: Viewport,
        pins: &[Pin],
    ) -> String {
        let mut href = format!(
            "/graph?url={}&roles={}&filter={}&sort={}",
            urlencoding::encode(self.url),
            self.palette == Palette::Roles,
            filter_key(filter),
            sort_key(sort),
        );
        if !viewport.is_identity() {
            href.push_str(&format!(
                "&scale={}&tx={}&ty={}",
                num(viewport.scale),
                num(viewport.translate_x),
                num(viewport.translate_y)
            ));
        }
        if !pins.is_empty() {
            href.push_str("&pin=");
            href.push_str(&urlencoding::encode(&Pin::encode_list(pins)));
        }
        if let Some(id) = hover {
            href.push_str("&hover=");
            href.push_str(&urlencoding::encode(id));
        }
        href
    }
}

const fn filter_key(filter: RoleFilter) -> &'static str {
    match filter {
        RoleFilter::All => "all",
        RoleFilter::Admin => "admin",
        RoleFilter::Mod => "mod",
        RoleFilter::Senior => "senior",
    }
}

const fn sort_key(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Floor => "floor",
        PostSort::Likes => "likes",
        PostSort::Reads => "reads",
    }
}

fn base_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" data-theme="dark" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Thread Graph Explorer" }
                link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css";
                style { (PreEscaped(PAGE_STYLE)) }
            }
            body {
                header class="container" {
                    nav {
                        ul { li { a href="/" { strong { "Thread Graph Explorer" } } } }
                    }
                }
                main class="container" { (content) }
            }
        }
    }
}

/// Landing page with the thread URL form.
#[must_use]
pub fn render_home(error: Option<&str>, url: &str) -> Markup {
    let content = html! {
        h1 { "Analyze a thread" }
        @if let Some(message) = error {
            article class="error" { (message) }
        }
        form method="get" action="/graph" {
            input type="hidden" name="refresh" value="1";
            input type="url" name="url" value=(url) required
                placeholder="https://forum.example.com/t/some-topic/1234";
            button type="submit" { "Analyze" }
        }
        p class="muted" {
            "JSON: " code { "/api/analyze?url=..." } " · Download: " code { "/api/export?url=..." }
        }
    };
    base_layout("Analyze", content)
}

/// Analysis page for one thread.
#[must_use]
pub fn render_graph_page(view: &GraphView<'_>) -> Markup {
    let report = view.report;
    let content = html! {
        h1 { (report.thread.title) }
        p {
            a href=(report.thread.source_url) target="_blank" rel="noopener noreferrer" {
                "Open thread"
            }
            " · "
            a href={ "/api/export?url=" (urlencoding::encode(view.url)) } { "Export JSON" }
            " · "
            a href={ (view.href(None, view.filter, view.sort)) "&refresh=1" } { "Re-fetch" }
        }
        (render_stats(report))
        (render_like_failures(report))
        section {
            h2 { "Interaction graph" }
            (render_legend(view))
            @if let Some(card) = view.hover_card {
                (render_hover_card(card, view))
            }
            (render_view_controls(view))
            (render_svg(view))
        }
        @if !report.summary.analysis.is_empty() {
            section {
                h2 { "Summary" }
                p { (report.summary.analysis) }
            }
        }
        (render_timeline(report))
        (render_anomalies(report))
        (render_posts(view))
    };
    base_layout(&report.thread.title, content)
}

fn render_stats(report: &AnalysisReport) -> Markup {
    let stats = &report.stats;
    html! {
        section class="grid" {
            article { strong { (stats.total_posts) } br; small { "Posts" } }
            article { strong { (stats.total_likes) } br; small { "Likes" } }
            article { strong { (stats.participants) } br; small { "Participants" } }
            article { strong { (stats.staff_posts) } br; small { "Staff posts" } }
        }
    }
}

fn render_like_failures(report: &AnalysisReport) -> Markup {
    html! {
        @if !report.like_failures.is_empty() {
            article class="warning" {
                "Likes could not be loaded for "
                (report.like_failures.len())
                " post(s): "
                @for (i, failure) in report.like_failures.iter().enumerate() {
                    @if i > 0 { ", " }
                    "#" (failure.floor)
                }
                ". Their likers are missing from the graph."
            }
        }
    }
}

fn render_legend(view: &GraphView<'_>) -> Markup {
    let classes = [
        NodeClass::Admin,
        NodeClass::Mod,
        NodeClass::Senior,
        NodeClass::Member,
        NodeClass::Basic,
        NodeClass::Visitor,
    ];
    let toggle = GraphView {
        palette: if view.palette == Palette::Roles {
            Palette::Uniform
        } else {
            Palette::Roles
        },
        ..*view
    };
    html! {
        p class="legend" {
            @if view.palette == Palette::Roles {
                @for class in classes {
                    span {
                        span class="swatch" style={ "background:" (class.color()) } {}
                        (class.label())
                    }
                }
            }
            a href=(toggle.href(None, view.filter, view.sort)) {
                @if view.palette == Palette::Roles { "Hide roles" } @else { "Show roles" }
            }
        }
    }
}

fn render_hover_card(card: &HoverCard, view: &GraphView<'_>) -> Markup {
    let held = view.pins.iter().any(|p| p.id == card.user);
    let position = view.snapshot.node(&card.user).map(|n| (n.x, n.y));
    let others: Vec<Pin> = view
        .pins
        .iter()
        .filter(|p| p.id != card.user)
        .cloned()
        .collect();
    let pin_here = position.filter(|_| !held).map(|(x, y)| {
        let mut pins = others.clone();
        pins.push(Pin {
            id: card.user.clone(),
            x,
            y,
        });
        view.pins_href(&pins)
    });

    html! {
        article class="hover-card" {
            header {
                strong { (card.user) }
                " "
                a href=(view.href(None, view.filter, view.sort)) { "clear" }
            }
            @if card.has_persona {
                p { (card.persona) }
            } @else {
                p class="muted" { (card.persona) }
            }
            footer {
                @if held {
                    a href=(view.pins_href(&others)) { "Unpin" }
                    " · "
                    a href={ (view.pins_href(view.pins)) "&release=" (urlencoding::encode(&card.user)) } {
                        "Let go"
                    }
                }
                @if let Some(href) = pin_here {
                    a href=(href) { "Pin here" }
                }
                @if let Some((x, y)) = position {
                    (render_drag_form(card, view, &others, x, y))
                }
            }
        }
    }
}

/// Moves the hovered node to typed coordinates and holds it there.
fn render_drag_form(
    card: &HoverCard,
    view: &GraphView<'_>,
    others: &[Pin],
    x: f64,
    y: f64,
) -> Markup {
    html! {
        form class="drag" method="get" action="/graph" {
            input type="hidden" name="url" value=(view.url);
            input type="hidden" name="hover" value=(card.user);
            input type="hidden" name="roles" value=(if view.palette == Palette::Roles { "true" } else { "false" });
            input type="hidden" name="filter" value=(filter_key(view.filter));
            input type="hidden" name="sort" value=(sort_key(view.sort));
            @if !view.viewport.is_identity() {
                input type="hidden" name="scale" value=(num(view.viewport.scale));
                input type="hidden" name="tx" value=(num(view.viewport.translate_x));
                input type="hidden" name="ty" value=(num(view.viewport.translate_y));
            }
            @if !others.is_empty() {
                input type="hidden" name="pin" value=(Pin::encode_list(others));
            }
            input type="hidden" name="drag" value=(card.user);
            label { "x " input type="number" name="drag_x" value=(num(x)) step="any"; }
            label { "y " input type="number" name="drag_y" value=(num(y)) step="any"; }
            button type="submit" { "Move" }
        }
    }
}

fn render_view_controls(view: &GraphView<'_>) -> Markup {
    let (cx, cy) = (view.snapshot.width / 2.0, view.snapshot.height / 2.0);
    let zoomed = |factor: f64| {
        let mut viewport = view.viewport;
        viewport.zoom_at(factor, cx, cy);
        view.viewport_href(viewport)
    };
    let panned = |dx: f64, dy: f64| {
        let mut viewport = view.viewport;
        viewport.pan(dx, dy);
        view.viewport_href(viewport)
    };
    html! {
        p class="controls" {
            a href=(zoomed(ZOOM_STEP)) title="Zoom in" { "+" } " "
            a href=(zoomed(1.0 / ZOOM_STEP)) title="Zoom out" { "−" } " "
            a href=(panned(PAN_STEP, 0.0)) title="Pan left" { "←" } " "
            a href=(panned(-PAN_STEP, 0.0)) title="Pan right" { "→" } " "
            a href=(panned(0.0, PAN_STEP)) title="Pan up" { "↑" } " "
            a href=(panned(0.0, -PAN_STEP)) title="Pan down" { "↓" } " "
            @if !view.viewport.is_identity() {
                a href=(view.viewport_href(Viewport::default())) { "Reset view" } " "
            }
            small class="muted" { (num(view.viewport.scale * 100.0)) "%" }
        }
    }
}

fn render_svg(view: &GraphView<'_>) -> Markup {
    let snapshot = view.snapshot;
    let graph = &view.report.graph;
    let viewport = view.viewport;
    html! {
        svg class="graph" xmlns="http://www.w3.org/2000/svg"
            width=(snapshot.width) height=(snapshot.height)
            viewBox={ "0 0 " (snapshot.width) " " (snapshot.height) } {
            g class="viewport" transform={
                "translate(" (num(viewport.translate_x)) "," (num(viewport.translate_y)) ") "
                "scale(" (num(viewport.scale)) ")"
            } {
                g class="links" {
                    @for (link, style) in snapshot.links.iter().zip(&view.spotlight.links) {
                        @let source = &snapshot.nodes[link.source];
                        @let target = &snapshot.nodes[link.target];
                        line x1=(fmt(source.x)) y1=(fmt(source.y))
                            x2=(fmt(target.x)) y2=(fmt(target.y))
                            stroke=(style.color) stroke-opacity=(style.opacity)
                            stroke-width=(fmt(1.5 * (link.count as f64).sqrt()));
                    }
                }
                g class="arrows" {
                    @for (link, style) in snapshot.links.iter().zip(&view.spotlight.links) {
                        @let source = &snapshot.nodes[link.source];
                        @let target = &snapshot.nodes[link.target];
                        @let angle = (target.y - source.y).atan2(target.x - source.x).to_degrees();
                        path d="M0,-4 L8,0 L0,4" fill=(style.color)
                            opacity=(style.arrow_opacity)
                            transform={
                                "translate(" (fmt((source.x + target.x) / 2.0)) ","
                                (fmt((source.y + target.y) / 2.0)) ") rotate(" (fmt(angle)) ")"
                            };
                    }
                }
                g class="nodes" {
                    @for (i, node) in snapshot.nodes.iter().enumerate() {
                        @let color = graph.node(&node.id).map_or(NodeClass::Visitor.color(), |u| view.palette.color_for(u));
                        a href=(view.href(Some(&node.id), view.filter, view.sort)) {
                            g transform={ "translate(" (fmt(node.x)) "," (fmt(node.y)) ")" }
                                opacity=(view.spotlight.node_opacity.get(i).copied().unwrap_or(1.0)) {
                                title { (node.id) }
                                @if node.pinned {
                                    circle class="pinned" r=(fmt(node.radius)) fill=(color)
                                        stroke="#f8fafc" stroke-width="2" stroke-dasharray="3 2" {}
                                } @else {
                                    circle r=(fmt(node.radius)) fill=(color) stroke="#1e293b" stroke-width="2" {}
                                }
                                text dx="14" dy="4" { (node.id) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_timeline(report: &AnalysisReport) -> Markup {
    html! {
        section {
            h2 { "Activity timeline" }
            table {
                thead { tr { th { "Date" } th { "Posts" } th { "Likes" } } }
                tbody {
                    @for bucket in &report.timeline {
                        tr { td { (bucket.date) } td { (bucket.post_count) } td { (bucket.like_sum) } }
                    }
                }
            }
        }
    }
}

fn render_anomalies(report: &AnalysisReport) -> Markup {
    html! {
        section {
            h2 { "High reads, low engagement" }
            @if report.anomalies.is_empty() {
                p class="muted" { "No anomalous posts." }
            } @else {
                table {
                    thead { tr { th { "#" } th { "Author" } th { "Reads" } th { "Likes" } } }
                    tbody {
                        @for post in &report.anomalies {
                            tr {
                                td { (post.floor) }
                                td { (post.author) }
                                td { (post.read_count) }
                                td { (post.like_count) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_posts(view: &GraphView<'_>) -> Markup {
    let mut posts = filter_posts(&view.report.thread.posts, view.filter);
    sort_posts(&mut posts, view.sort);
    let filters = [
        (RoleFilter::All, "All"),
        (RoleFilter::Admin, "Admin"),
        (RoleFilter::Mod, "Mod"),
        (RoleFilter::Senior, "Senior"),
    ];
    let sorts = [
        (PostSort::Floor, "Floor"),
        (PostSort::Likes, "Likes"),
        (PostSort::Reads, "Reads"),
    ];

    html! {
        section {
            h2 { "Posts" }
            p {
                @for (filter, label) in filters {
                    @if filter == view.filter {
                        strong { (label) } " "
                    } @else {
                        a href=(view.href(None, filter, view.sort)) { (label) } " "
                    }
                }
                " | "
                @for (sort, label) in sorts {
                    @if sort == view.sort {
                        strong { (label) } " "
                    } @else {
                        a href=(view.href(None, view.filter, sort)) { (label) } " "
                    }
                }
            }
            table {
                thead {
                    tr { th { "#" } th { "Author" } th { "Roles" } th { "Likes" } th { "Reads" } th { "Text" } }
                }
                tbody {
                    @for post in posts {
                        tr {
                            td { (post.floor) }
                            td { (post.author_display_name) br; small class="muted" { "@" (post.author) } }
                            td {
                                @for tag in &post.author_role_tags { (tag.to_string()) " " }
                            }
                            td { (post.like_count) }
                            td { (post.read_count) }
                            td { (excerpt(&post.body_text)) }
                        }
                    }
                }
            }
        }
    }
}

fn fmt(value: f64) -> String {
    format!("{value:.1}")
}

/// Viewport numbers keep enough precision to survive repeated zooming.
fn num(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn excerpt(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(LIMIT).collect();
    cut.push('…');
    cut
}
