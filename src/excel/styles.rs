//! Cell formatting read straight from the xlsx package
//!
//! calamine exposes values only, so fonts, fills, borders, alignment, number
//! formats and sheet geometry are read from `xl/styles.xml` and the worksheet
//! part. Theme colours stay theme references; indexed colours resolve
//! through the legacy palette.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{DashError, DashResult};
use crate::types::{
    Alignment, BorderStyle, CellColor, CellStyle, Fill, Font, HorizontalAlign, MergedRange, VerticalAlign,
};

/// Number formats every spreadsheet application knows without a `<numFmt>`
fn builtin_number_format(id: u32) -> Option<&'static str> {
    match id {
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        49 => Some("@"),
        _ => None,
    }
}

/// The `cellXfs` table of a workbook, resolved into plain cell styles
#[derive(Debug, Clone, Default)]
pub struct PackageStyles {
    cell_xfs: Vec<CellStyle>,
}

impl PackageStyles {
    /// Style for a cell's `s` attribute; unknown indices give the default style
    pub fn style(&self, xf: u32) -> CellStyle {
        self.cell_xfs.get(xf as usize).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cell_xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_xfs.is_empty()
    }

    /// Parse `xl/styles.xml`
    pub fn parse(xml: &str) -> DashResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut number_formats: HashMap<u32, String> = HashMap::new();
        let mut fonts: Vec<Font> = Vec::new();
        let mut fills: Vec<Fill> = Vec::new();
        let mut borders: Vec<BorderStyle> = Vec::new();
        let mut xfs: Vec<RawXf> = Vec::new();

        let mut section = Section::None;
        let mut font = Font::default();
        let mut fill = Fill::default();
        let mut border = BorderStyle::None;
        let mut in_pattern_fill = false;

        loop {
            let event = reader.read_event()?;
            let (e, is_empty) = match &event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(e) => {
                    match e.local_name().as_ref() {
                        b"fonts" | b"fills" | b"borders" | b"cellXfs" => section = Section::None,
                        b"font" if section == Section::Fonts => fonts.push(std::mem::take(&mut font)),
                        b"fill" if section == Section::Fills => fills.push(std::mem::take(&mut fill)),
                        b"border" if section == Section::Borders => {
                            borders.push(std::mem::replace(&mut border, BorderStyle::None))
                        }
                        b"patternFill" => in_pattern_fill = false,
                        _ => {}
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            match (section, e.local_name().as_ref()) {
                (_, b"numFmt") => {
                    let id = attr(e, b"numFmtId").and_then(|v| v.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr(e, b"formatCode")) {
                        number_formats.insert(id, code);
                    }
                }
                (_, b"fonts") => section = Section::Fonts,
                (_, b"fills") => section = Section::Fills,
                (_, b"borders") => section = Section::Borders,
                (_, b"cellXfs") => section = Section::CellXfs,
                (_, b"cellStyleXfs") | (_, b"dxfs") if !is_empty => section = Section::Skipped,

                (Section::Fonts, b"font") if is_empty => fonts.push(Font::default()),
                (Section::Fonts, b"name") => font.name = attr(e, b"val"),
                (Section::Fonts, b"sz") => font.size = attr(e, b"val").and_then(|v| v.parse().ok()),
                (Section::Fonts, b"b") => font.bold = flag(e),
                (Section::Fonts, b"i") => font.italic = flag(e),
                (Section::Fonts, b"u") => font.underline = attr(e, b"val").map_or(true, |v| v != "none"),
                (Section::Fonts, b"color") => font.color = parse_color(e),

                (Section::Fills, b"fill") if is_empty => fills.push(Fill::default()),
                (Section::Fills, b"patternFill") => {
                    in_pattern_fill = !is_empty && attr(e, b"patternType").as_deref() == Some("solid");
                }
                (Section::Fills, b"fgColor") if in_pattern_fill => {
                    fill.color = parse_color(e);
                }

                (Section::Borders, b"border") if is_empty => borders.push(BorderStyle::None),
                (Section::Borders, b"left" | b"right" | b"top" | b"bottom") => {
                    border = border.max_with(parse_border(attr(e, b"style").as_deref()));
                }

                (Section::CellXfs, b"xf") => {
                    xfs.push(RawXf {
                        num_fmt_id: attr(e, b"numFmtId").and_then(|v| v.parse().ok()).unwrap_or(0),
                        font_id: attr(e, b"fontId").and_then(|v| v.parse().ok()),
                        fill_id: attr(e, b"fillId").and_then(|v| v.parse().ok()),
                        border_id: attr(e, b"borderId").and_then(|v| v.parse().ok()),
                        alignment: Alignment::default(),
                    });
                }
                (Section::CellXfs, b"alignment") => {
                    if let Some(xf) = xfs.last_mut() {
                        xf.alignment = parse_alignment(e);
                    }
                }
                _ => {}
            }
        }

        let cell_xfs = xfs
            .into_iter()
            .map(|xf| CellStyle {
                font: xf.font_id.and_then(|i| fonts.get(i).cloned()).unwrap_or_default(),
                fill: xf.fill_id.and_then(|i| fills.get(i).copied()).unwrap_or_default(),
                alignment: xf.alignment,
                number_format: number_formats
                    .get(&xf.num_fmt_id)
                    .cloned()
                    .or_else(|| builtin_number_format(xf.num_fmt_id).map(str::to_string)),
                border: xf.border_id.and_then(|i| borders.get(i).copied()).unwrap_or_default(),
            })
            .collect();

        Ok(Self { cell_xfs })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Skipped,
}

#[derive(Debug)]
struct RawXf {
    num_fmt_id: u32,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    alignment: Alignment,
}

impl BorderStyle {
    fn weight(self) -> u8 {
        match self {
            BorderStyle::None => 0,
            BorderStyle::Thin => 1,
            BorderStyle::Medium => 2,
            BorderStyle::Thick => 3,
        }
    }

    /// Heavier of two edge styles
    fn max_with(self, other: BorderStyle) -> BorderStyle {
        if other.weight() > self.weight() {
            other
        } else {
            self
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes().flatten().find(|a| a.key.local_name().as_ref() == name).map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
    })
}

/// `<b/>` and `<b val="1"/>` are on, `<b val="0"/>` is off
fn flag(e: &BytesStart<'_>) -> bool {
    !matches!(attr(e, b"val").as_deref(), Some("0") | Some("false"))
}

/// `FFRRGGBB` or `RRGGBB` → 0xRRGGBB
fn parse_rgb(value: &str) -> Option<u32> {
    let hex = if value.len() == 8 { value.get(2..)? } else { value };
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Default `indexedColors` palette, 0xRRGGBB
const INDEXED_COLORS: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];

/// `<color>` / `<fgColor>`: explicit rgb wins, then theme, then indexed.
/// Indexed 64 is the system colour and reads as none.
fn parse_color(e: &BytesStart<'_>) -> Option<CellColor> {
    if let Some(rgb) = attr(e, b"rgb").and_then(|v| parse_rgb(&v)) {
        return Some(CellColor::Rgb(rgb));
    }
    if let Some(index) = attr(e, b"theme").and_then(|v| v.parse::<u8>().ok()) {
        let tint = attr(e, b"tint")
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(0, |t| (t.clamp(-1.0, 1.0) * 1000.0).round() as i16);
        return Some(CellColor::Theme { index, tint });
    }
    attr(e, b"indexed")
        .and_then(|v| v.parse::<usize>().ok())
        .and_then(|i| INDEXED_COLORS.get(i).copied())
        .map(CellColor::Rgb)
}

fn parse_border(style: Option<&str>) -> BorderStyle {
    match style {
        None | Some("none") => BorderStyle::None,
        Some("medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" | "double") => BorderStyle::Medium,
        Some("thick") => BorderStyle::Thick,
        Some(_) => BorderStyle::Thin,
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Alignment {
    Alignment {
        horizontal: match attr(e, b"horizontal").as_deref() {
            Some("left") => HorizontalAlign::Left,
            Some("center" | "centerContinuous") => HorizontalAlign::Center,
            Some("right") => HorizontalAlign::Right,
            _ => HorizontalAlign::General,
        },
        vertical: match attr(e, b"vertical").as_deref() {
            Some("center") => VerticalAlign::Center,
            Some("top") => VerticalAlign::Top,
            _ => VerticalAlign::Bottom,
        },
        wrap_text: matches!(attr(e, b"wrapText").as_deref(), Some("1") | Some("true")),
    }
}

//==============================================================================
// Worksheet layout
//==============================================================================

/// Per-cell style indices and sheet geometry of one worksheet part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// `(0-based row, 0-based col)` → `cellXfs` index
    pub cell_styles: BTreeMap<(usize, usize), u32>,
    /// 0-based column → width in character units
    pub column_widths: BTreeMap<u16, f64>,
    /// 0-based row → height in points, `customHeight` rows only
    pub row_heights: BTreeMap<u32, f64>,
    pub merged: Vec<MergedRange>,
}

impl SheetLayout {
    pub fn parse(xml: &str) -> DashResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut layout = SheetLayout::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"col" => {
                        let min: Option<u16> = attr(&e, b"min").and_then(|v| v.parse().ok());
                        let max: Option<u16> = attr(&e, b"max").and_then(|v| v.parse().ok());
                        let width: Option<f64> = attr(&e, b"width").and_then(|v| v.parse().ok());
                        if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                            // Whole-sheet ranges (max = 16384) only set a default
                            for col in min..=max.min(min.saturating_add(255)) {
                                layout.column_widths.insert(col.saturating_sub(1), width);
                            }
                        }
                    }
                    b"row" if matches!(attr(&e, b"customHeight").as_deref(), Some("1") | Some("true")) => {
                        let row: Option<u32> = attr(&e, b"r").and_then(|v| v.parse().ok());
                        let height: Option<f64> = attr(&e, b"ht").and_then(|v| v.parse().ok());
                        if let (Some(row), Some(height)) = (row, height) {
                            layout.row_heights.insert(row.saturating_sub(1), height);
                        }
                    }
                    b"mergeCell" => {
                        if let Some(range) = attr(&e, b"ref").and_then(|r| MergedRange::parse(&r)) {
                            layout.merged.push(range);
                        }
                    }
                    b"c" => {
                        let position = attr(&e, b"r").and_then(|r| parse_cell_ref(&r));
                        let xf = attr(&e, b"s").and_then(|s| s.parse::<u32>().ok());
                        if let (Some(position), Some(xf)) = (position, xf) {
                            if xf != 0 {
                                layout.cell_styles.insert(position, xf);
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(layout)
    }
}

/// `B3` → `(2, 1)`
pub fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    let row: usize = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

//==============================================================================
// Package access
//==============================================================================

/// Zip-level view of an xlsx file for the parts calamine does not expose
pub struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl Package {
    pub fn new(bytes: Vec<u8>) -> DashResult<Self> {
        Ok(Self {
            archive: ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    fn read_part(&mut self, name: &str) -> DashResult<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(Some(content))
    }

    /// Workbook styles; a package without `styles.xml` has only defaults
    pub fn styles(&mut self) -> DashResult<PackageStyles> {
        match self.read_part("xl/styles.xml")? {
            Some(xml) => PackageStyles::parse(&xml),
            None => Ok(PackageStyles::default()),
        }
    }

    /// Layout of the worksheet named `sheet`
    pub fn sheet_layout(&mut self, sheet: &str) -> DashResult<SheetLayout> {
        let path = self.sheet_path(sheet)?;
        match self.read_part(&path)? {
            Some(xml) => SheetLayout::parse(&xml),
            None => Err(DashError::Read(format!("worksheet part '{}' missing", path))),
        }
    }

    /// Resolve a sheet name to its part path via the workbook relationships
    fn sheet_path(&mut self, sheet: &str) -> DashResult<String> {
        let workbook = self
            .read_part("xl/workbook.xml")?
            .ok_or_else(|| DashError::Read("xl/workbook.xml missing".to_string()))?;
        let rels = self
            .read_part("xl/_rels/workbook.xml.rels")?
            .ok_or_else(|| DashError::Read("workbook relationships missing".to_string()))?;

        let rel_id = find_element_attr(&workbook, b"sheet", |e| attr(e, b"name").as_deref() == Some(sheet), |e| {
            e.attributes()
                .flatten()
                .find(|a| a.key.as_ref() == b"r:id" || (a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some()))
                .map(|a| String::from_utf8_lossy(&a.value).into_owned())
        })?
        .ok_or_else(|| DashError::Read(format!("sheet '{}' has no relationship", sheet)))?;

        let target = find_element_attr(&rels, b"Relationship", |e| attr(e, b"Id").as_deref() == Some(rel_id.as_str()), |e| {
            attr(e, b"Target")
        })?
        .ok_or_else(|| DashError::Read(format!("relationship '{}' not found", rel_id)))?;

        Ok(match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        })
    }
}

/// First element named `tag` accepted by `matches`, mapped through `extract`
fn find_element_attr(
    xml: &str,
    tag: &[u8],
    matches: impl Fn(&BytesStart<'_>) -> bool,
    extract: impl Fn(&BytesStart<'_>) -> Option<String>,
) -> DashResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == tag && matches(&e) => {
                return Ok(extract(&e));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
