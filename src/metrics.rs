use invertechs_rs::entity::{EntitySet, MetricDescriptor, Unit};
use invertechs_rs::model::Snapshot;
use invertechs_rs::Error;
use prometheus::{Encoder, Gauge, GaugeVec, TextEncoder};

lazy_static! {
    static ref STATION_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "invertechs_station_metric",
            "station reading from the latest snapshot",
        ),
        &["station_id", "station", "metric", "field", "unit", "class"],
    )
    .unwrap();
    static ref INVERTER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "invertechs_inverter_metric",
            "inverter reading from the latest snapshot",
        ),
        &["station_id", "inverter_id", "model", "metric", "field", "unit", "class"],
    )
    .unwrap();
    static ref REFRESH_GAUGE: Gauge = register_gauge!(opts!(
        "invertechs_last_refresh_success",
        "1 if the last aggregation cycle succeeded",
    ))
    .unwrap();
}

fn unit(descriptor: &MetricDescriptor) -> &'static str {
    descriptor.unit.map_or("", Unit::symbol)
}

/// Rebuild every gauge from `snapshot`. Unavailable readings are left out rather than zeroed.
pub fn update(entities: &EntitySet, snapshot: &Snapshot, refresh_ok: bool) {
    STATION_GAUGE.reset();
    INVERTER_GAUGE.reset();

    for entity in &entities.stations {
        let station = entity.device_name.as_str();
        for descriptor in &entity.metrics {
            if let Some(reading) = entity.read(snapshot, descriptor) {
                STATION_GAUGE
                    .with_label_values(&[
                        entity.station_id.as_str(),
                        station,
                        descriptor.label,
                        descriptor.key,
                        unit(descriptor),
                        descriptor.class.name(),
                    ])
                    .set(reading.as_f64());
            }
        }
    }

    for entity in &entities.inverters {
        for descriptor in &entity.metrics {
            if let Some(reading) = entity.read(snapshot, descriptor) {
                INVERTER_GAUGE
                    .with_label_values(&[
                        entity.station_id.as_str(),
                        entity.inverter_id.as_str(),
                        entity.model.as_str(),
                        descriptor.label,
                        descriptor.key,
                        unit(descriptor),
                        descriptor.class.name(),
                    ])
                    .set(reading.as_f64());
            }
        }
    }

    REFRESH_GAUGE.set(if refresh_ok { 1.0 } else { 0.0 });
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Format(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::Format(e.to_string()))
}
