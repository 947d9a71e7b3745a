//! Visualization utilities for TSP tours and colony runs.
//!
//! Generates SVG drawings of a tour and of the convergence of a run, plus
//! plain-text exports for external plotting. PNG output goes through
//! `resvg` and needs the `png` feature.

use crate::instance::TspInstance;
use crate::runner::IterationLog;
use crate::solution::Solution;
use std::fs::File;
use std::io::Write;
use std::path::Path;
#[cfg(feature = "png")]
use resvg::render;
#[cfg(feature = "png")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "png")]
use resvg::usvg;
#[cfg(feature = "png")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "png")]
use resvg::FitTo;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// City marker radius
    pub node_radius: f64,
    /// Draw city ids next to the markers
    pub labels: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 4.0,
            labels: true,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// SVG of a closed tour over the instance's cities
    pub fn generate_tour_svg(&self, instance: &TspInstance, solution: &Solution) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = self.get_bounds(instance);

        let scale_x = (self.width - 2.0 * self.margin) / (max_x - min_x).max(1.0);
        let scale_y = (self.height - 2.0 * self.margin) / (max_y - min_y).max(1.0);
        let scale = scale_x.min(scale_y);

        svg.push_str(&self.header(self.width, self.height));
        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | Length: {:.2} | {}</text>
"##,
            self.margin, instance.name, solution.length, solution.algorithm
        ));

        let transform = |x: f64, y: f64| -> (f64, f64) {
            let tx = self.margin + (x - min_x) * scale;
            let ty = self.height - self.margin - (y - min_y) * scale;
            (tx, ty)
        };

        let on_map = |c: &usize| *c < instance.cities.len();
        if solution.tour.len() > 1 && solution.tour.iter().all(on_map) {
            let points: Vec<String> = solution
                .tour
                .iter()
                .map(|&c| {
                    let (x, y) = transform(instance.cities[c].x, instance.cities[c].y);
                    format!("{:.2},{:.2}", x, y)
                })
                .collect();
            svg.push_str(&format!(
                r##"<polygon points="{}" class="edge"/>
"##,
                points.join(" ")
            ));
        }

        for city in &instance.cities {
            let (x, y) = transform(city.x, city.y);
            let class = if city.id == 0 { "start" } else { "node" };

            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="{}"/>
"##,
                x, y, self.node_radius, class
            ));

            if self.labels {
                svg.push_str(&format!(
                    r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                    x,
                    y - self.node_radius - 3.0,
                    city.id
                ));
            }
        }

        svg.push_str("</svg>");

        svg
    }

    /// Iteration-best and global-best length per iteration
    pub fn generate_convergence_svg(&self, title: &str, logs: &[IterationLog]) -> String {
        let width = self.width;
        let height = 400.0;
        let margin = self.margin;
        let mut svg = self.header(width, height);

        svg.push_str(&format!(
            r#"<text x="{}" y="25" class="title">Convergence - {}</text>
"#,
            margin, title
        ));

        let plot_width = width - 2.0 * margin;
        let plot_height = height - 2.0 * margin;
        svg.push_str(&format!(
            r##"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" class="axis"/>
<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" class="axis"/>
"##,
            m = margin,
            b = height - margin,
            r = width - margin
        ));

        if logs.is_empty() {
            svg.push_str("</svg>");
            return svg;
        }

        let low = logs.iter().map(|l| l.global_best).fold(f64::INFINITY, f64::min);
        let high = logs.iter().map(|l| l.iteration_best).fold(f64::NEG_INFINITY, f64::max);
        let range = if high > low { high - low } else { 1.0 };
        let x_scale = plot_width / (logs.len().max(2) - 1) as f64;
        let y_scale = plot_height / range;

        let path = |value: fn(&IterationLog) -> f64| -> String {
            logs.iter()
                .enumerate()
                .map(|(i, l)| {
                    let x = margin + i as f64 * x_scale;
                    let y = height - margin - (value(l) - low) * y_scale;
                    format!("{} {:.2} {:.2}", if i == 0 { "M" } else { "L" }, x, y)
                })
                .collect::<Vec<_>>()
                .join(" ")
        };

        svg.push_str(&format!(
            r##"<path d="{}" class="iteration"/>
<path d="{}" class="global"/>
"##,
            path(|l| l.iteration_best),
            path(|l| l.global_best)
        ));

        svg.push_str(&format!(
            r##"<text x="{:.2}" y="{:.2}" class="label">{:.2}</text>
<text x="{:.2}" y="{:.2}" class="label">{:.2}</text>
<text x="{:.2}" y="{:.2}" class="label">{} iterations</text>
"##,
            5.0,
            height - margin,
            low,
            5.0,
            margin + 10.0,
            low + range,
            width - margin - 80.0,
            height - margin + 20.0,
            logs.len()
        ));

        svg.push_str("</svg>");
        svg
    }

    fn header(&self, width: f64, height: f64) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .node {{ fill: #3498db; stroke: #2c3e50; stroke-width: 1; }}
    .start {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 1; }}
    .edge {{ stroke: #34495e; stroke-width: 1.5; fill: none; }}
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .iteration {{ stroke: #95a5a6; stroke-width: 1; fill: none; }}
    .global {{ stroke: #e74c3c; stroke-width: 2; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            width, height, width, height
        )
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Render an SVG string to a PNG file.
    #[cfg(feature = "png")]
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let opt = usvg::Options::default();
        let rtree = usvg::Tree::from_str(svg, &opt).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, format!("usvg parse error: {}", e))
        })?;
        let (w, h) = svg_size(svg).unwrap_or((self.width as u32, self.height as u32));
        let mut pixmap = Pixmap::new(w.max(1), h.max(1))
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to create pixmap"))?;
        render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "resvg render failed"))?;
        pixmap
            .save_png(path.as_ref())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("save_png failed: {}", e)))
    }

    #[cfg(not(feature = "png"))]
    pub fn save_png<P: AsRef<Path>>(&self, _svg: &str, path: P) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("cannot write {}: built without the `png` feature", path.as_ref().display()),
        ))
    }

    /// Get coordinate bounds
    fn get_bounds(&self, instance: &TspInstance) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for city in &instance.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        (min_x, max_x, min_y, max_y)
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, instance: &TspInstance, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# TSP Tour Data\n");
        data.push_str(&format!("# Instance: {}\n", instance.name));
        data.push_str(&format!("# Length: {:.2}\n\n", solution.length));

        data.push_str("# Cities: id, x, y\n");
        for city in &instance.cities {
            data.push_str(&format!("{},{},{}\n", city.id, city.x, city.y));
        }

        data.push_str("\n# Tour: sequence of city ids\n");
        let tour_str: Vec<String> = solution.tour.iter().map(|n| n.to_string()).collect();
        data.push_str(&tour_str.join(","));
        data.push('\n');

        data
    }
}

/// Canvas size from the root element's `width`/`height` attributes.
#[cfg(feature = "png")]
fn svg_size(svg: &str) -> Option<(u32, u32)> {
    let attribute = |name: &str| -> Option<u32> {
        let (_, rest) = svg.split_once(&format!(" {}=\"", name))?;
        let (value, _) = rest.split_once('"')?;
        value.parse::<f64>().ok().map(|v| v as u32)
    };
    Some((attribute("width")?, attribute("height")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> TspInstance {
        TspInstance::from_coordinates("triangle", &[(0.0, 0.0), (30.0, 0.0), (0.0, 40.0)])
    }

    fn logs() -> Vec<IterationLog> {
        [(130.0, 120.0), (110.0, 110.0), (115.0, 110.0)]
            .iter()
            .enumerate()
            .map(|(i, &(iteration_best, global_best))| IterationLog {
                iteration: i + 1,
                iteration_best,
                global_best,
                elapsed: 0.0,
                iteration_time: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_tour_svg() {
        let instance = create_test_instance();
        let world = instance.world().unwrap();
        let solution = Solution::from_tour(&world, vec![0, 1, 2], "RBAS");

        let viz = Visualizer::new();
        let svg = viz.generate_tour_svg(&instance, &solution);

        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("triangle"));
        assert!(svg.contains("Length: 120.00"));
        assert!(svg.contains("<polygon"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_incomplete_tour_draws_cities_only() {
        let instance = create_test_instance();
        let solution = Solution { tour: vec![0, 7], ..Solution::new() };
        let svg = Visualizer::new().generate_tour_svg(&instance, &solution);
        assert!(!svg.contains("<polygon"));
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn test_convergence_svg() {
        let viz = Visualizer::new();
        let svg = viz.generate_convergence_svg("triangle", &logs());
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("3 iterations"));

        let empty = viz.generate_convergence_svg("none", &[]);
        assert!(!empty.contains("<path"));
        assert!(empty.ends_with("</svg>"));
    }

    #[test]
    fn test_export_plot_data() {
        let instance = create_test_instance();
        let world = instance.world().unwrap();
        let solution = Solution::from_tour(&world, vec![0, 2, 1], "RBAS");
        let data = Visualizer::new().export_plot_data(&instance, &solution);
        assert!(data.contains("1,30,0"));
        assert!(data.ends_with("0,2,1\n"));
    }

    #[cfg(not(feature = "png"))]
    #[test]
    fn test_png_requires_feature() {
        let err = Visualizer::new().save_png("<svg/>", "out.png").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    }

    #[cfg(feature = "png")]
    #[test]
    fn test_svg_size() {
        let svg = Visualizer::new().generate_convergence_svg("x", &logs());
        assert_eq!(svg_size(&svg), Some((800, 400)));
    }
}
