//! End-to-end: JSON records in, every analysis out, results back to JSON.

use u_quality::anova::calculate_anova;
use u_quality::capability::{calculate_stats, Grade, SpecLimits};
use u_quality::data::{numeric_column, Filter, Row};
use u_quality::gage::calculate_gage_rr;
use u_quality::probability::calculate_probability_plot_data;
use u_quality::regression::{calculate_multiple_regression, calculate_regression, RegressionOptions};
use u_quality::spc::{nelson_rule2_sequences, ControlLimits};
use u_quality::variation::{category_contributions, drill_down_variation};

/// Fill-line records as an ingestion layer would hand them over: numbers
/// sometimes arrive as strings, some cells are null or absent.
fn production_rows() -> Vec<Row> {
    let mut records = Vec::new();
    let lines = ["A", "B", "C"];
    for i in 0..30 {
        let line = lines[i % 3];
        let temp = 180.0 + (i % 5) as f64 * 2.0;
        let shift = (i % 3) as f64 * 1.5;
        let noise = [0.3, -0.2, 0.1, -0.4, 0.2, 0.0, -0.1][i % 7];
        let weight = 250.0 + 0.5 * (temp - 180.0) + shift + noise;
        let weight_cell = if i % 4 == 0 {
            serde_json::json!(format!("{weight}"))
        } else {
            serde_json::json!(weight)
        };
        records.push(serde_json::json!({
            "line": line,
            "shift": if i < 15 { "day" } else { "night" },
            "temp": temp,
            "weight": weight_cell,
        }));
    }
    records.push(serde_json::json!({ "line": "A", "temp": null, "weight": 251.0 }));
    records.push(serde_json::json!({ "line": "B", "weight": "not measured" }));

    let text = serde_json::to_string(&records).expect("serialize");
    serde_json::from_str(&text).expect("rows deserialize")
}

#[test]
fn rows_deserialize_with_coercion() {
    let rows = production_rows();
    assert_eq!(rows.len(), 32);
    assert!(rows[0].number("weight").is_some(), "string numbers coerce");
    assert_eq!(rows[30].number("temp"), None);
    assert_eq!(rows[31].number("weight"), None);
    assert_eq!(numeric_column(&rows, "weight").len(), 31);
}

#[test]
fn capability_and_run_rules() {
    let rows = production_rows();
    let weights = numeric_column(&rows, "weight");
    let spec = SpecLimits::new(Some(262.0), Some(246.0)).expect("valid spec");
    let grades = vec![
        Grade::new(252.0, "light").unwrap(),
        Grade::new(256.0, "nominal").unwrap(),
        Grade::new(260.0, "heavy").unwrap(),
    ];
    let stats = calculate_stats(&weights, Some(&spec), Some(&grades));

    assert_eq!(stats.n, 31);
    assert!(stats.cp.unwrap() >= stats.cpk.unwrap());
    assert_eq!(stats.out_of_spec_percentage, Some(0.0));
    let counted: usize = stats.grade_counts.as_ref().unwrap().iter().map(|g| g.count).sum();
    assert_eq!(counted, 31);

    let limits = ControlLimits::from_stats(&stats);
    assert!(limits.beyond_limits(&weights).is_empty());
    // the data cycles through lines, so no long one-sided runs
    assert!(nelson_rule2_sequences(&weights, stats.mean).is_empty());
}

#[test]
fn line_effect_is_detected() {
    let rows = production_rows();
    let anova = calculate_anova(&rows, "line", "weight").expect("three lines");
    assert_eq!(anova.groups.len(), 3);
    assert!(anova.is_significant, "p = {}", anova.p_value);
    assert!((anova.ssb + anova.ssw - anova.sst).abs() < 1e-9);

    let parts = category_contributions(&rows, "line", "weight").expect("contributions");
    let pct: f64 = parts.iter().map(|c| c.pct_of_between).sum();
    assert!((pct - 100.0).abs() < 1e-9);

    let chain = drill_down_variation(
        &rows,
        "weight",
        &[Filter::new("line", "C"), Filter::new("shift", "day")],
    )
    .expect("chain");
    assert_eq!(chain.len(), 2);
    assert!((chain[0].eta_squared - anova.eta_squared).abs() < 1e-12);
}

#[test]
fn regressions() {
    let rows = production_rows();
    let simple = calculate_regression(&rows, "temp", "weight").expect("simple fit");
    assert!(simple.linear.slope > 0.0);

    let opts = RegressionOptions {
        categorical_columns: vec![],
        include_interactions: false,
    };
    let multi = calculate_multiple_regression(&rows, "weight", &["temp", "line"], &opts)
        .expect("multiple fit");
    assert_eq!(multi.n, 30);
    assert_eq!(multi.terms.len(), 3);
    assert_eq!(multi.coefficients.len(), multi.terms.len() + 1);
    assert!((multi.coefficients[1].coefficient - 0.5).abs() < 0.1);
    assert!(multi.r_squared > 0.9);

    let predicted = multi
        .predict(&Row::new().with("temp", 184.0).with("line", "B"))
        .expect("prediction");
    assert!((predicted - (250.0 + 2.0 + 1.5)).abs() < 0.5, "predicted {predicted}");
}

#[test]
fn gage_and_probability_plot() {
    let mut rows = Vec::new();
    for (p, size) in [(1, 9.8), (2, 10.4), (3, 10.0), (4, 9.6), (5, 10.2)] {
        for (op, bias) in [("Ann", 0.0), ("Bob", 0.02), ("Cy", -0.01)] {
            for rep in [-0.01, 0.01] {
                rows.push(
                    Row::new()
                        .with("part", p)
                        .with("operator", op)
                        .with("diameter", size + bias + rep),
                );
            }
        }
    }
    let gage = calculate_gage_rr(&rows, "part", "operator", "diameter").expect("balanced study");
    assert_eq!(gage.part_count, 5);
    assert_eq!(gage.operator_count, 3);
    assert_eq!(gage.total_measurements, 30);
    assert_eq!(gage.var_total, gage.var_part + gage.var_grr);
    assert!(gage.pct_grr < 30.0);

    let values = numeric_column(&rows, "diameter");
    let plot = calculate_probability_plot_data(&values);
    assert_eq!(plot.len(), values.len());
    assert!(plot.windows(2).all(|w| w[0].value <= w[1].value));
}

#[test]
fn results_serialize_to_json() {
    let rows = production_rows();
    let anova = calculate_anova(&rows, "line", "weight").unwrap();
    let json = serde_json::to_value(&anova).expect("serialize");
    assert_eq!(json["groups"].as_array().map(Vec::len), Some(3));

    let multi = calculate_multiple_regression(
        &rows,
        "weight",
        &["temp", "line"],
        &RegressionOptions::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&multi).expect("serialize");
    assert_eq!(json["terms"][1]["type"], "categorical");

    let text = serde_json::to_string(&multi).unwrap();
    let back: u_quality::regression::MultiRegressionResult =
        serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back.terms, multi.terms);
    assert_eq!(back.p, multi.p);
}
