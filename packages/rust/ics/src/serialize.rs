//! Calendar serializer: wraps merged blocks in a single `VCALENDAR`.

use calmerge_shared::CalendarProperties;

use crate::merge::MergedCalendar;

/// Line terminator required by RFC 5545.
pub const LINE_ENDING: &str = "\r\n";

/// Serialize with the default product id.
pub fn serialize(events: &MergedCalendar, calendar_name: &str, timezone_name: &str) -> String {
    let props = CalendarProperties {
        name: calendar_name.to_string(),
        timezone: timezone_name.to_string(),
        ..CalendarProperties::default()
    };
    serialize_with(events, &props)
}

/// Render the full document: header, every block in identifier order, footer.
///
/// Every line, including the last, ends with `\r\n`.
pub fn serialize_with(events: &MergedCalendar, props: &CalendarProperties) -> String {
    let header = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", props.product_id),
        format!("X-WR-CALNAME:{}", props.name),
        format!("X-WR-TIMEZONE:{}", props.timezone),
    ];

    let mut out = String::new();
    for line in &header {
        push_line(&mut out, line);
    }
    for block in events {
        for line in block.lines() {
            push_line(&mut out, line);
        }
    }
    push_line(&mut out, "END:VCALENDAR");
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(LINE_ENDING);
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmerge_shared::EventBlock;

    fn calendar(uids: &[&str]) -> MergedCalendar {
        uids.iter()
            .map(|uid| {
                EventBlock::new(*uid, format!("BEGIN:VEVENT\nUID:{uid}\nSUMMARY:Game {uid}\nEND:VEVENT"))
            })
            .collect()
    }

    #[test]
    fn empty_calendar_has_header_and_footer() {
        let doc = serialize(&MergedCalendar::new(), "Club", "UTC");
        assert_eq!(
            doc,
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//calmerge//Merged ICS//EN\r\n\
             X-WR-CALNAME:Club\r\n\
             X-WR-TIMEZONE:UTC\r\n\
             END:VCALENDAR\r\n"
        );
    }

    #[test]
    fn blocks_emitted_in_identifier_order_with_crlf() {
        let doc = serialize(&calendar(&["b", "a"]), "Club", "Europe/Berlin");
        let expected_body = "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Game a\r\nEND:VEVENT\r\n\
                             BEGIN:VEVENT\r\nUID:b\r\nSUMMARY:Game b\r\nEND:VEVENT\r\n";
        assert!(doc.contains(expected_body));
        assert!(doc.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(!doc.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn output_is_independent_of_insertion_order() {
        let first = serialize(&calendar(&["x", "y", "z"]), "C", "T");
        let second = serialize(&calendar(&["z", "x", "y"]), "C", "T");
        assert_eq!(first, second);
        assert_eq!(first, serialize(&calendar(&["x", "y", "z"]), "C", "T"));
    }

    #[test]
    fn custom_product_id() {
        let props = CalendarProperties {
            name: "Club".into(),
            timezone: "UTC".into(),
            product_id: "-//Club//Games//DE".into(),
        };
        let doc = serialize_with(&calendar(&["a"]), &props);
        assert!(doc.contains("\r\nPRODID:-//Club//Games//DE\r\n"));
    }
}
