use once_cell::sync::Lazy;
use rand::Rng;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    domain::{QuarterHourSeries, SLOT_LENGTH},
    edifact::{format_datetime, format_interchange_stamp, format_quantity, EdifactMessage, SegmentWriter, SERVICE_STRING_ADVICE},
};

const SYNTAX_IDENTIFIER: &str = "UNOC:3";
const MESSAGE_TYPE: &str = "MSCONS:D:04B:UN:2.4c";
const DOCUMENT_NAME: &str = "Z48";
const MESSAGE_FUNCTION_ORIGINAL: &str = "9";
const CODE_LIST_AGENCY_BDEW: &str = "293";
const PARTNER_ID_AGENCY: &str = "500";
const CHECK_IDENTIFIER: &str = "Z13:13025";

// Reported once per process; the offset lookup fails e.g. on Unix once
// other threads are running.
static LOCAL_OFFSET_UNAVAILABLE: Lazy<()> =
    Lazy::new(|| tracing::warn!("local UTC offset unavailable, interchange stamps use UTC"));

/// Routing identity of the sending and receiving market partners.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct PartnerConfig {
    pub sender_id: String,
    pub recipient_id: String,
    /// Application reference in UNB, e.g. `TL` for metered load profiles.
    pub app_code: String,
}

impl Default for PartnerConfig {
    fn default() -> Self {
        Self {
            sender_id: "9979383000006".to_string(),
            recipient_id: "9906629000002".to_string(),
            app_code: "TL".to_string(),
        }
    }
}

/// What the quantity segment ahead of the interval block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum PlaceholderFlavor {
    /// Literal `0`.
    Zero,
    /// First interval value, at least `0.001`, three decimals.
    #[default]
    FirstValue,
}

impl PlaceholderFlavor {
    fn render(self, values: &[f64]) -> String {
        match self {
            Self::Zero => "0".to_string(),
            Self::FirstValue => {
                let first = values
                    .first()
                    .copied()
                    .filter(|v| v.is_finite() && *v != 0.0)
                    .unwrap_or(0.001);
                format!("{:.3}", first.max(0.001))
            }
        }
    }
}

/// Preparation time and reference number of one interchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterchangeStamp {
    pub prepared_at: PrimitiveDateTime,
    /// Seven-digit number shared by interchange and message references.
    pub reference: u32,
}

impl InterchangeStamp {
    /// Local wall clock (UTC if the local offset cannot be determined) and a
    /// random reference. References are not coordinated across calls.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| {
            Lazy::force(&LOCAL_OFFSET_UNAVAILABLE);
            OffsetDateTime::now_utc()
        });
        Self {
            prepared_at: PrimitiveDateTime::new(now.date(), now.time()),
            reference: rand::thread_rng().gen_range(1_000_000..10_000_000),
        }
    }

    pub fn interchange_ref(&self) -> String {
        format!("D{}", self.reference)
    }

    pub fn message_ref(&self) -> String {
        format!("MS{}{:02}", self.reference, self.prepared_at.second())
    }
}

/// Assembles one MSCONS interchange per metering point and day.
///
/// The builder does no validation: a wrong number of values or an odd
/// metering point id is written out as given. Only non-finite quantities are
/// replaced by `0`.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    partner: PartnerConfig,
    placeholder: PlaceholderFlavor,
}

impl MessageBuilder {
    pub fn new(partner: PartnerConfig, placeholder: PlaceholderFlavor) -> Self {
        Self { partner, placeholder }
    }

    pub fn partner(&self) -> &PartnerConfig {
        &self.partner
    }

    pub fn build(
        &self,
        metering_point: &str,
        obis: &str,
        window_start: PrimitiveDateTime,
        window_end: PrimitiveDateTime,
        values: &[f64],
    ) -> EdifactMessage {
        self.build_with_stamp(&InterchangeStamp::now(), metering_point, obis, window_start, window_end, values)
    }

    /// Convenience over [`MessageBuilder::build`] taking the window from `series`.
    pub fn build_series(&self, metering_point: &str, obis: &str, series: &QuarterHourSeries) -> EdifactMessage {
        let window = series.window();
        self.build(metering_point, obis, window.start, window.end, series.values())
    }

    pub fn build_with_stamp(
        &self,
        stamp: &InterchangeStamp,
        metering_point: &str,
        obis: &str,
        window_start: PrimitiveDateTime,
        window_end: PrimitiveDateTime,
        values: &[f64],
    ) -> EdifactMessage {
        let interchange_ref = stamp.interchange_ref();
        let message_ref = stamp.message_ref();
        let sender = &self.partner.sender_id;
        let recipient = &self.partner.recipient_id;

        let mut msg = SegmentWriter::with_capacity(512 + values.len() * 96);
        msg.segment("UNH", &[&message_ref, MESSAGE_TYPE]);
        msg.segment("BGM", &[DOCUMENT_NAME, &message_ref, MESSAGE_FUNCTION_ORIGINAL]);
        msg.segment("DTM", &[&format!("137:{}:303", format_datetime(stamp.prepared_at))]);
        msg.segment("RFF", &[CHECK_IDENTIFIER]);
        msg.segment("NAD", &["MS", &format!("{sender}::{CODE_LIST_AGENCY_BDEW}")]);
        msg.segment("NAD", &["MR", &format!("{recipient}::{CODE_LIST_AGENCY_BDEW}")]);
        msg.segment("UNS", &["D"]);
        msg.segment("NAD", &["DP"]);
        msg.segment("LOC", &["172", metering_point]);
        msg.segment("DTM", &[&format!("163:{}:303", format_datetime(window_start))]);
        msg.segment("DTM", &[&format!("164:{}:303", format_datetime(window_end))]);
        msg.segment("LIN", &["1"]);
        msg.segment("PIA", &["5", &format!("1-0?:{obis}:SRW")]);
        msg.segment("QTY", &[&format!("220:{}", self.placeholder.render(values))]);

        let mut slot_start = window_start;
        for value in values {
            let slot_end = slot_start + SLOT_LENGTH;
            msg.segment("DTM", &[&format!("163:{}:303", format_datetime(slot_start))]);
            msg.segment("DTM", &[&format!("164:{}:303", format_datetime(slot_end))]);
            msg.segment("QTY", &[&format!("220:{}", format_quantity(*value))]);
            slot_start = slot_end;
        }

        let segment_count = (msg.count() + 1).to_string();
        msg.segment("UNT", &[&segment_count, &message_ref]);

        let mut out = SegmentWriter::with_capacity(msg.count() * 32 + 256);
        let unb_stamp = format_interchange_stamp(stamp.prepared_at);
        out.segment(
            "UNB",
            &[
                SYNTAX_IDENTIFIER,
                &format!("{sender}:{PARTNER_ID_AGENCY}"),
                &format!("{recipient}:{PARTNER_ID_AGENCY}"),
                &unb_stamp,
                &interchange_ref,
                "",
                &self.partner.app_code,
            ],
        );
        let header = out.into_inner();
        let body = msg.into_inner();

        let mut text = String::with_capacity(SERVICE_STRING_ADVICE.len() + header.len() + body.len() + 32);
        text.push_str(SERVICE_STRING_ADVICE);
        text.push_str(&header);
        text.push_str(&body);

        let mut trailer = SegmentWriter::with_capacity(32);
        trailer.segment("UNZ", &["1", &interchange_ref]);
        text.push_str(&trailer.into_inner());

        EdifactMessage(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edifact::check_shape;
    use time::macros::datetime;

    fn stamp() -> InterchangeStamp {
        InterchangeStamp {
            prepared_at: datetime!(2026-02-02 09:05:07),
            reference: 1_234_567,
        }
    }

    #[test]
    fn stamp_is_available_from_multithreaded_callers() {
        let utc = OffsetDateTime::now_utc();
        let worker = std::thread::spawn(|| std::thread::sleep(std::time::Duration::from_millis(50)));
        let stamps: Vec<_> = (0..2).map(|_| InterchangeStamp::now()).collect();
        worker.join().unwrap();

        for s in stamps {
            assert!((1_000_000..10_000_000).contains(&s.reference));
            let drift = s.prepared_at - PrimitiveDateTime::new(utc.date(), utc.time());
            assert!(drift.whole_hours().abs() <= 14);
        }
    }

    fn build(values: &[f64], placeholder: PlaceholderFlavor) -> String {
        let start = datetime!(2025-08-15 22:00);
        MessageBuilder::new(PartnerConfig::default(), placeholder)
            .build_with_stamp(&stamp(), "99999999999", "1.8.0", start, start + time::Duration::days(1), values)
            .into_string()
    }

    #[test]
    fn starts_with_service_advice_and_interchange_header() {
        let text = build(&[0.25; 96], PlaceholderFlavor::Zero);
        assert!(text.starts_with("UNA:+.? 'UNB+UNOC:3+9979383000006:500+9906629000002:500+260202:0905+D1234567++TL'"));
        assert!(text.ends_with("UNZ+1+D1234567'"));
        assert!(!text.contains('\n') && !text.contains('\r'));
    }

    #[test]
    fn header_segments_in_order() {
        let text = build(&[0.25; 96], PlaceholderFlavor::Zero);
        let expected = concat!(
            "UNH+MS123456707+MSCONS:D:04B:UN:2.4c'",
            "BGM+Z48+MS123456707+9'",
            "DTM+137:202602020905?+00:303'",
            "RFF+Z13:13025'",
            "NAD+MS+9979383000006::293'",
            "NAD+MR+9906629000002::293'",
            "UNS+D'",
            "NAD+DP'",
            "LOC+172+99999999999'",
            "DTM+163:202508152200?+00:303'",
            "DTM+164:202508162200?+00:303'",
            "LIN+1'",
            "PIA+5+1-0?:1.8.0:SRW'",
            "QTY+220:0'",
            "DTM+163:202508152200?+00:303'",
            "DTM+164:202508152215?+00:303'",
            "QTY+220:0.25'",
        );
        assert!(text.contains(expected));
    }

    #[test]
    fn trailer_counts_message_segments() {
        let text = build(&[1.0; 96], PlaceholderFlavor::Zero);
        // 13 header + placeholder + 96 * 3 + UNT
        assert!(text.contains("UNT+303+MS123456707'"));
        assert_eq!(text.matches("UNT+").count(), 1);
        assert_eq!(text.matches("UNZ+").count(), 1);
    }

    #[test]
    fn last_slot_ends_at_window_end() {
        let text = build(&[1.0; 96], PlaceholderFlavor::Zero);
        assert!(text.contains("DTM+163:202508162145?+00:303'DTM+164:202508162200?+00:303'QTY+220:1'UNT+"));
    }

    #[test]
    fn first_value_placeholder_is_clamped() {
        let mut values = vec![0.0; 96];
        assert!(build(&values, PlaceholderFlavor::FirstValue).contains("PIA+5+1-0?:1.8.0:SRW'QTY+220:0.001'"));
        values[0] = 5.2;
        assert!(build(&values, PlaceholderFlavor::FirstValue).contains("SRW'QTY+220:5.200'"));
        values[0] = -3.0;
        assert!(build(&values, PlaceholderFlavor::FirstValue).contains("SRW'QTY+220:0.001'"));
    }

    #[test]
    fn non_finite_quantities_are_written_as_zero() {
        let mut values = vec![1.0; 96];
        values[3] = f64::NAN;
        let text = build(&values, PlaceholderFlavor::Zero);
        assert!(text.contains("DTM+164:202508152300?+00:303'QTY+220:0'"));
    }

    #[test]
    fn wrong_length_input_is_not_rejected() {
        let text = build(&[1.0; 3], PlaceholderFlavor::Zero);
        // 13 header + placeholder + 3 * 3 + UNT
        assert!(text.contains("UNT+24+"));
    }

    #[test]
    fn random_stamps_build_well_formed_messages() {
        let start = datetime!(2025-08-15 00:00);
        let msg = MessageBuilder::default().build("99999999999", "1.8.0", start, start + time::Duration::days(1), &[0.5; 96]);
        let text = msg.as_str();
        assert!(text.starts_with("UNA:+.? 'UNB+"));
        assert!(text.contains("UNZ+1+D"));
        assert_eq!(check_shape(text), Ok(()));
    }
}
