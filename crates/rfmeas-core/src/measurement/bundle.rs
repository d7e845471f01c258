//! Bundle serialization
//!
//! Two interchangeable sidecar formats describe a measurement record:
//! the XML `.meas` schema of the external calibration tool and a
//! flatter JSON `.smeas` schema. Both encode provenance metadata plus
//! `(name, file_path)` entries for the nominal realization(s) and each
//! ensemble; data files are always stored separately.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use super::ensemble::EnsembleKind;
use super::realization::Realization;
use super::record::MeasurementRecord;
use super::MeasurementError;

fn bundle_err<E: std::fmt::Display>(e: E) -> MeasurementError {
    MeasurementError::Bundle(e.to_string())
}

// ---------------------------------------------------------------------------
// XML (.meas)
// ---------------------------------------------------------------------------

pub(crate) fn write_xml(
    record: &MeasurementRecord,
    path: &Path,
) -> Result<(), MeasurementError> {
    let content = to_xml_string(record)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub(crate) fn read_xml(path: &Path) -> Result<MeasurementRecord, MeasurementError> {
    let content = std::fs::read_to_string(path)?;
    from_xml_str(&content)
}

fn to_xml_string(record: &MeasurementRecord) -> Result<String, MeasurementError> {
    let mut buf = Vec::new();
    let mut writer = Writer::new_with_indent(&mut buf, b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(bundle_err)?;

    let file_name = record
        .file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut root = BytesStart::new("CorrectedMeasurement");
    root.push_attribute(("FileName", file_name.as_str()));
    root.push_attribute(("UserName", record.user_name.as_str()));
    root.push_attribute(("CreationTime", record.creation_time.as_str()));
    writer.write_event(Event::Start(root)).map_err(bundle_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("Controls")))
        .map_err(bundle_err)?;

    let groups: [(&str, &[Realization]); 3] = [
        (EnsembleKind::Nominal.xml_tag(), &record.nominal),
        (EnsembleKind::MonteCarlo.xml_tag(), record.monte_carlo.items()),
        (EnsembleKind::Perturbed.xml_tag(), record.perturbed.items()),
    ];
    for (tag, items) in groups {
        let count = items.len().to_string();
        let mut group = BytesStart::new(tag);
        group.push_attribute(("Count", count.as_str()));
        writer.write_event(Event::Start(group)).map_err(bundle_err)?;

        for (index, item) in items.iter().enumerate() {
            let index = index.to_string();
            let path = item.file_path.display().to_string();

            let mut element = BytesStart::new("Item");
            element.push_attribute(("Index", index.as_str()));
            element.push_attribute(("Text", item.name.as_str()));
            writer
                .write_event(Event::Start(element))
                .map_err(bundle_err)?;

            for (sub_index, text) in [item.name.as_str(), path.as_str()].iter().enumerate() {
                let sub_index = sub_index.to_string();
                let mut sub = BytesStart::new("SubItem");
                sub.push_attribute(("Index", sub_index.as_str()));
                sub.push_attribute(("Text", *text));
                writer.write_event(Event::Empty(sub)).map_err(bundle_err)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("Item")))
                .map_err(bundle_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(bundle_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Controls")))
        .map_err(bundle_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("CorrectedMeasurement")))
        .map_err(bundle_err)?;

    String::from_utf8(buf).map_err(bundle_err)
}

fn from_xml_str(content: &str) -> Result<MeasurementRecord, MeasurementError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut record = MeasurementRecord::new();
    let mut current: Option<EnsembleKind> = None;
    let mut item_text: Option<String> = None;
    let mut sub_name: Option<String> = None;
    let mut sub_path: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(bundle_err)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"CorrectedMeasurement" => {
                        if let Some(user) = attr(e, "UserName") {
                            record.user_name = user;
                        }
                        if let Some(time) = attr(e, "CreationTime") {
                            record.creation_time = time;
                        }
                    }
                    b"MeasSParams" => current = Some(EnsembleKind::Nominal),
                    b"MonteCarloPerturbedSParams" => current = Some(EnsembleKind::MonteCarlo),
                    b"PerturbedSParams" => current = Some(EnsembleKind::Perturbed),
                    b"Item" => {
                        item_text = attr(e, "Text");
                        sub_name = None;
                        sub_path = None;
                        if empty {
                            push_entry(&mut record, current, &item_text, &None, &None);
                        }
                    }
                    b"SubItem" => {
                        let index = attr(e, "Index").unwrap_or_default();
                        let text = attr(e, "Text");
                        match index.as_str() {
                            "0" => sub_name = text,
                            "1" => sub_path = text,
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"Item" => {
                    push_entry(&mut record, current, &item_text, &sub_name, &sub_path);
                    item_text = None;
                }
                b"MeasSParams" | b"MonteCarloPerturbedSParams" | b"PerturbedSParams" => {
                    current = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(record)
}

fn attr(element: &BytesStart, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn push_entry(
    record: &mut MeasurementRecord,
    current: Option<EnsembleKind>,
    item_text: &Option<String>,
    sub_name: &Option<String>,
    sub_path: &Option<String>,
) {
    let Some(kind) = current else { return };
    let fallback = item_text.clone().unwrap_or_default();
    let name = sub_name.clone().unwrap_or_else(|| fallback.clone());
    let path = sub_path.clone().unwrap_or(fallback);
    let item = Realization::new(name, path);
    match kind {
        EnsembleKind::Nominal => record.nominal.push(item),
        EnsembleKind::MonteCarlo => record.monte_carlo.add_item(item),
        EnsembleKind::Perturbed => record.perturbed.add_item(item),
    }
}

// ---------------------------------------------------------------------------
// JSON (.smeas)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct BundleDoc {
    file_path: String,
    user_name: String,
    creation_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calibration: Option<String>,
    nominal: Vec<BundleEntry>,
    monte_carlo: Vec<BundleEntry>,
    perturbed: Vec<BundleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BundleEntry {
    name: String,
    file_path: String,
}

impl BundleEntry {
    fn from_realization(item: &Realization) -> Self {
        Self {
            name: item.name.clone(),
            file_path: item.file_path.display().to_string(),
        }
    }

    fn into_realization(self) -> Realization {
        Realization::new(self.name, self.file_path)
    }
}

pub(crate) fn write_json(
    record: &MeasurementRecord,
    path: &Path,
) -> Result<(), MeasurementError> {
    let content = to_json_string(record)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub(crate) fn read_json(path: &Path) -> Result<MeasurementRecord, MeasurementError> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

fn to_json_string(record: &MeasurementRecord) -> Result<String, MeasurementError> {
    let doc = BundleDoc {
        file_path: record
            .file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        user_name: record.user_name.clone(),
        creation_time: record.creation_time.clone(),
        calibration: record.calibration.clone(),
        nominal: record
            .nominal
            .iter()
            .map(BundleEntry::from_realization)
            .collect(),
        monte_carlo: record
            .monte_carlo
            .items()
            .iter()
            .map(BundleEntry::from_realization)
            .collect(),
        perturbed: record
            .perturbed
            .items()
            .iter()
            .map(BundleEntry::from_realization)
            .collect(),
    };
    serde_json::to_string_pretty(&doc).map_err(bundle_err)
}

fn from_json_str(content: &str) -> Result<MeasurementRecord, MeasurementError> {
    let doc: BundleDoc = serde_json::from_str(content).map_err(bundle_err)?;
    let mut record = MeasurementRecord::new();
    record.user_name = doc.user_name;
    record.creation_time = doc.creation_time;
    record.calibration = doc.calibration;
    for entry in doc.nominal {
        record.nominal.push(entry.into_realization());
    }
    for entry in doc.monte_carlo {
        record.monte_carlo.add_item(entry.into_realization());
    }
    for entry in doc.perturbed {
        record.perturbed.add_item(entry.into_realization());
    }
    Ok(record)
}
