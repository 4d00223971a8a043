//! plotly.js figure writer
//!
//! Converts the encoded points into a plotly.js figure (`data`, `layout`,
//! `config`) for a 3D scatter:
//!
//! - x = product name, y = region, z = summed order quantity
//! - one `scatter3d` trace per region, so each region gets a legend entry
//! - marker size/color come straight from the encoder
//! - hover text is `"<product> / <region>"`

use serde_json::{json, Value};

use super::html::escape_html;
use super::{ChartData, Writer};
use crate::encode::EncodedPoint;
use crate::naming::display_label;
use crate::Result;

/// plotly.js figure JSON writer
pub struct PlotlyWriter {
    /// Base name for images saved from the plotly toolbar
    image_name: String,
}

impl PlotlyWriter {
    pub fn new() -> Self {
        Self {
            image_name: "3d_sales_volume_product_region".to_string(),
        }
    }

    /// Group points by region, in the order regions first appear
    fn region_groups<'a>(
        points: &'a [EncodedPoint],
    ) -> Vec<(Option<&'a str>, Vec<&'a EncodedPoint>)> {
        let mut groups: Vec<(Option<&str>, Vec<&EncodedPoint>)> = Vec::new();
        for point in points {
            let region = point.point.region.as_deref();
            match groups.iter_mut().find(|(r, _)| *r == region) {
                Some((_, members)) => members.push(point),
                None => groups.push((region, vec![point])),
            }
        }
        groups
    }

    fn trace(region: Option<&str>, points: &[&EncodedPoint], opacity: f64) -> Value {
        let region_label = display_label(region);
        let products: Vec<&str> = points
            .iter()
            .map(|p| display_label(p.point.product_name.as_deref()))
            .collect();
        let hover: Vec<String> = products
            .iter()
            .map(|product| format!("{} / {}", product, region_label))
            .collect();
        let quantities: Vec<i64> = points.iter().map(|p| p.point.order_quantity).collect();
        let sizes: Vec<f64> = points.iter().map(|p| p.marker_size).collect();
        // Every point in a trace shares the region, hence the color
        let color = points.first().map(|p| p.color.as_str()).unwrap_or_default();

        json!({
            "type": "scatter3d",
            "mode": "markers",
            "name": region_label,
            "x": products,
            "y": vec![region_label; points.len()],
            "z": quantities,
            "text": hover,
            "hovertemplate": "%{text}<br>Order Quantity: %{z}<extra></extra>",
            "marker": {
                "size": sizes,
                "color": color,
                "opacity": opacity
            }
        })
    }

    fn title(data: &ChartData) -> String {
        let mut title = escape_html(&data.chart.title);
        if data.chart.show_sources && !data.sources.is_empty() {
            let files: Vec<String> = data.sources.iter().map(|s| escape_html(s)).collect();
            title.push_str(&format!(
                "<br><sub>Files used in merge: {}</sub>",
                files.join(", ")
            ));
        }
        title
    }

    fn axis(title: &str, tick_angle: Option<f64>, tick_font_size: f64) -> Value {
        let mut axis = json!({
            "title": {"text": title},
            "tickfont": {"size": tick_font_size}
        });
        if let Some(angle) = tick_angle {
            axis["tickangle"] = json!(angle);
        }
        axis
    }
}

impl Default for PlotlyWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for PlotlyWriter {
    type Output = Value;

    fn write(&self, data: &ChartData) -> Result<Value> {
        self.validate(data)?;
        let chart = data.chart;

        let traces: Vec<Value> = Self::region_groups(data.points)
            .into_iter()
            .map(|(region, points)| Self::trace(region, &points, chart.opacity))
            .collect();

        let [eye_x, eye_y, eye_z] = chart.camera_eye;
        let layout = json!({
            "title": {
                "text": Self::title(data),
                "x": 0.5,
                "xanchor": "center"
            },
            "showlegend": true,
            "legend": {"title": {"text": chart.y_title}},
            "scene": {
                "xaxis": Self::axis(&chart.x_title, Some(chart.tick_angle), chart.tick_font_size),
                "yaxis": Self::axis(&chart.y_title, Some(chart.tick_angle), chart.tick_font_size),
                "zaxis": Self::axis(&chart.z_title, None, chart.tick_font_size),
                "camera": {"eye": {"x": eye_x, "y": eye_y, "z": eye_z}}
            }
        });

        Ok(json!({
            "data": traces,
            "layout": layout,
            "config": {
                "responsive": true,
                "displaylogo": false,
                "toImageButtonOptions": {"format": "png", "filename": self.image_name}
            }
        }))
    }
}
