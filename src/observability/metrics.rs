use prometheus::{Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub orders_created_total: IntCounter,
    pub settlements_closed_total: IntCounter,
    pub settlement_last_payable: GaugeVec,
    pub pix_payloads_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order transition requests by event and outcome",
            ),
            &["event", "outcome"],
        )
        .expect("valid order_transitions_total metric");

        let orders_created_total =
            IntCounter::new("orders_created_total", "Orders accepted from intake")
                .expect("valid orders_created_total metric");

        let settlements_closed_total =
            IntCounter::new("settlements_closed_total", "Courier settlement cycles closed")
                .expect("valid settlements_closed_total metric");

        let settlement_last_payable = GaugeVec::new(
            Opts::new(
                "settlement_last_payable",
                "Payable amount of the most recent close per courier",
            ),
            &["courier_id"],
        )
        .expect("valid settlement_last_payable metric");

        let pix_payloads_total =
            IntCounter::new("pix_payloads_total", "Pix charge payloads handed off")
                .expect("valid pix_payloads_total metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(settlements_closed_total.clone()))
            .expect("register settlements_closed_total");
        registry
            .register(Box::new(settlement_last_payable.clone()))
            .expect("register settlement_last_payable");
        registry
            .register(Box::new(pix_payloads_total.clone()))
            .expect("register pix_payloads_total");

        Self {
            registry,
            order_transitions_total,
            orders_created_total,
            settlements_closed_total,
            settlement_last_payable,
            pix_payloads_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
