use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use solar_atlas::models::{BoundingBox, Cell, ClimateTable};
use solar_atlas::processors::RegionFilter;
use solar_atlas::readers::ClimateReader;
use solar_atlas::utils::coordinates::format_latlon;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

// Half-degree global grid, every 37th row carrying a missing value
fn create_global_grid(step: f64) -> ClimateTable {
    let mut columns = vec!["LAT".to_string(), "LON".to_string(), "PARAMETER".to_string()];
    columns.extend(MONTHS.iter().map(|m| m.to_string()));
    columns.push("ANN".to_string());

    let mut rows = Vec::new();
    let mut lat = -89.75;
    while lat < 90.0 {
        let mut lon = -179.75;
        while lon < 180.0 {
            let base = 4.0 + (lat / 90.0_f64).abs();
            let mut row = vec![
                Cell::Number(lat),
                Cell::Number(lon),
                Cell::Text("ALLSKY_SFC_SW_DWN".to_string()),
            ];
            for m in 0..MONTHS.len() {
                let value = if rows.len() % 37 == 0 && m == 2 {
                    -999.0
                } else {
                    base + m as f64 * 0.05
                };
                row.push(Cell::Number(value));
            }
            row.push(Cell::Number(base));
            rows.push(row);
            lon += step;
        }
        lat += step;
    }

    ClimateTable::new(columns, rows)
}

fn benchmark_region_filter(c: &mut Criterion) {
    let table = create_global_grid(1.0);
    let filter = RegionFilter::new(BoundingBox::default());

    c.bench_function("region_filter_brazil", |b| {
        b.iter(|| black_box(filter.apply(black_box(&table)).len()))
    });
}

fn benchmark_grid_cells(c: &mut Criterion) {
    let table = create_global_grid(1.0);
    let filtered = RegionFilter::new(BoundingBox::default()).apply(&table);

    c.bench_function("grid_cells_latlon", |b| {
        b.iter(|| {
            let keys: Vec<String> = filtered
                .grid_cells("ANN")
                .map(|cells| cells.map(|cell| format_latlon(cell.lat, cell.lon)).collect())
                .unwrap_or_default();
            black_box(keys.len())
        })
    });
}

fn benchmark_csv_parsing(c: &mut Criterion) {
    let table = create_global_grid(2.0);
    let mut content = String::from("-BEGIN HEADER-\n");
    for _ in 0..6 {
        content.push_str("metadata\n");
    }
    content.push_str("-END HEADER-\n");
    content.push_str(&table.columns.join(","));
    content.push('\n');
    for row in &table.rows {
        let fields: Vec<String> = row.iter().map(Cell::to_csv_field).collect();
        content.push_str(&fields.join(","));
        content.push('\n');
    }

    c.bench_function("climate_csv_parse", |b| {
        b.iter(|| {
            let parsed = ClimateReader::new().read_str(black_box(&content));
            black_box(parsed.map(|t| t.len()).unwrap_or(0))
        })
    });
}

fn benchmark_varying_grid_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_filter_by_resolution");

    for &step in &[2.0, 1.0, 0.5] {
        let table = create_global_grid(step);
        let filter = RegionFilter::new(BoundingBox::default());
        group.bench_with_input(BenchmarkId::new("step_degrees", step), &table, |b, table| {
            b.iter(|| black_box(filter.apply(table).len()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_region_filter,
    benchmark_grid_cells,
    benchmark_csv_parsing,
    benchmark_varying_grid_sizes
);
criterion_main!(benches);
