// Rule tables for the registration, admin and settings endpoints

use crate::validators::*;
use crate::{Activation, FieldRule, RuleSet, Validator};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// The ten divisions an applicant may choose from
pub const DIVISIONS: &[&str] = &[
    "Keagamaan",
    "Kedisiplinan",
    "Akademik",
    "Olahraga",
    "Seni",
    "Kewirausahaan",
    "Lingkungan",
    "Sosial",
    "Teknologi",
    "Humas",
];

pub const CLASSES: &[&str] = &["X", "XI", "XII"];

pub const RELIGIONS: &[&str] = &["Islam", "Kristen", "Katolik", "Hindu", "Buddha", "Konghucu"];

pub const GENDERS: &[&str] = &["Laki-laki", "Perempuan"];

pub const ACHIEVEMENT_LEVELS: &[&str] = &[
    "Sekolah",
    "Kecamatan",
    "Kabupaten/Kota",
    "Provinsi",
    "Nasional",
    "Internasional",
];

pub const ADMIN_ACTIONS: &[&str] = &["approve", "reject", "delete"];

/// Minimum and maximum number of divisions per applicant
pub const MIN_DIVISIONS: usize = 1;
pub const MAX_DIVISIONS: usize = 2;

/// Upper bound on repeated organisation/achievement rows
pub const MAX_HISTORY_ROWS: usize = 5;

/// `OSIS{yy}-{nnnnnn}-{L}`
pub static STRUCTURED_TICKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^OSIS\d{2}-\d{6}-[A-Z]$").unwrap());

/// Tickets issued before the structured format
pub static LEGACY_TICKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{8,20}$").unwrap());

static PERSON_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\s'.\-]+$").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

static BOT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{6,12}:[A-Za-z0-9_-]{30,50}$").unwrap());

static CHAT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());

/// Whether `ticket` uses the structured format
pub fn is_structured_ticket(ticket: &str) -> bool {
    STRUCTURED_TICKET.is_match(ticket)
}

/// Whether `ticket` is a legacy alphanumeric token
pub fn is_legacy_ticket(ticket: &str) -> bool {
    LEGACY_TICKET.is_match(ticket)
}

/// Accepted for status lookup: structured or legacy
pub fn is_lookup_ticket(ticket: &str) -> bool {
    is_structured_ticket(ticket) || is_legacy_ticket(ticket)
}

/// Name of the conditional reason field for a division
pub fn reason_field(division: &str) -> String {
    format!("alasan_{}", division)
}

/// Registration form rules, evaluated against today's local date
pub fn registration_rules() -> RuleSet {
    registration_rules_with(AgeRange::new(13, 20))
}

/// Registration form rules with the age check pinned to `today`
pub fn registration_rules_as_of(today: NaiveDate) -> RuleSet {
    registration_rules_with(AgeRange::new(13, 20).as_of(today))
}

fn registration_rules_with(age: AgeRange) -> RuleSet {
    let name_letters = Matches::regex(PERSON_NAME.clone(), "{label} hanya boleh berisi huruf");

    let rules = RuleSet::new()
        .rule(
            FieldRule::required("nama_lengkap", "Nama lengkap")
                .check(Length::between(3, 100))
                .check(name_letters),
        )
        .rule(
            FieldRule::required("nama_panggilan", "Nama panggilan").check(Length::between(2, 30)),
        )
        .rule(FieldRule::required("kelas", "Kelas").check(OneOf(CLASSES)))
        .rule(FieldRule::required("jurusan", "Jurusan").check(Length::between(2, 50)))
        .rule(
            FieldRule::required("tempat_lahir", "Tempat lahir").check(Length::between(2, 50)),
        )
        .rule(FieldRule::required("tanggal_lahir", "Tanggal lahir").check(age))
        .rule(FieldRule::required("alamat", "Alamat").check(Length::between(10, 500)))
        .rule(FieldRule::required("agama", "Agama").check(OneOf(RELIGIONS)))
        .rule(FieldRule::required("jenis_kelamin", "Jenis kelamin").check(OneOf(GENDERS)))
        .rule(
            FieldRule::required("nomor_telepon", "Nomor telepon").check(PhoneNumber::default()),
        )
        .rule(
            FieldRule::optional("email", "Email")
                .check(Length::max(100))
                .check(IsEmail),
        )
        .rule(FieldRule::optional("hobi", "Hobi").check(Length::max(200)))
        .rule(FieldRule::optional("motto", "Motto").check(Length::max(200)))
        .rule(
            FieldRule::required("motivasi", "Motivasi").check(Length::between(20, 1000)),
        )
        .rule(
            FieldRule::required("divisi", "Divisi")
                .list(MIN_DIVISIONS, MAX_DIVISIONS)
                .check(OneOf(DIVISIONS)),
        );

    let rules = rules.rules(DIVISIONS.iter().map(|division| {
        FieldRule::required(
            reason_field(division),
            format!("Alasan memilih divisi {}", division),
        )
        .check(Length::between(10, 500))
        .active_when(Activation::contains("divisi", *division))
    }));

    rules
        .rules(history_rules(
            "organisasi",
            "Nama organisasi",
            Length::between(2, 100),
            ("jabatan", "Jabatan organisasi", Box::new(Length::between(2, 50))),
        ))
        .rules(history_rules(
            "prestasi",
            "Nama prestasi",
            Length::between(3, 200),
            ("tingkat", "Tingkat prestasi", Box::new(OneOf(ACHIEVEMENT_LEVELS))),
        ))
}

type DetailRule = (&'static str, &'static str, Box<dyn Validator>);

/// Optional repeated `{prefix}_nama` rows. Every named row needs its detail
/// and year at the same position.
fn history_rules(
    prefix: &str,
    name_label: &str,
    name_check: Length,
    detail: DetailRule,
) -> Vec<FieldRule> {
    let name_field = format!("{}_nama", prefix);
    let (detail_suffix, detail_label, detail_check) = detail;
    let year = Matches::regex(YEAR.clone(), "{label} harus 4 digit angka");

    vec![
        FieldRule::optional(&name_field, name_label)
            .list(0, MAX_HISTORY_ROWS)
            .check(name_check),
        FieldRule::required(format!("{}_{}", prefix, detail_suffix), detail_label)
            .list(1, MAX_HISTORY_ROWS)
            .check(detail_check)
            .per_row_of(&name_field)
            .active_when(Activation::present(&name_field)),
        FieldRule::required(format!("{}_tahun", prefix), format!("Tahun {}", prefix))
            .list(1, MAX_HISTORY_ROWS)
            .check(year)
            .per_row_of(&name_field)
            .active_when(Activation::present(&name_field)),
    ]
}

/// Rules for the admin review action
pub fn admin_action_rules() -> RuleSet {
    RuleSet::new()
        .rule(
            FieldRule::required("ticket", "Tiket").check(Matches::regex(
                STRUCTURED_TICKET.clone(),
                "Format tiket tidak valid",
            )),
        )
        .rule(FieldRule::required("action", "Aksi").check(OneOf(ADMIN_ACTIONS)))
        .rule(
            FieldRule::required("reason", "Alasan penolakan")
                .check(Length::between(5, 500))
                .active_when(Activation::equals("action", "reject")),
        )
        .rule(
            FieldRule::required("divisi", "Divisi")
                .check(OneOf(DIVISIONS))
                .active_when(Activation::equals("action", "approve")),
        )
}

/// Rules for the portal settings update; every field is optional
pub fn settings_rules() -> RuleSet {
    RuleSet::new()
        .rule(
            FieldRule::optional("bot_token", "Token bot")
                .check(Matches::regex(BOT_TOKEN.clone(), "Format token bot tidak valid")),
        )
        .rule(
            FieldRule::optional("chat_id", "Chat ID")
                .check(Matches::regex(CHAT_ID.clone(), "Chat ID harus berupa angka")),
        )
        .rule(FieldRule::optional("group_link", "Link grup").check(IsUrl))
        .rule(
            FieldRule::optional("max_file_size", "Ukuran file maksimal")
                .check(IsInteger { min: 1, max: 50 }),
        )
        .rule(FieldRule::optional("registration_open", "Status pendaftaran").check(IsBoolean))
}

/// Rule for the ticket path segment of a status lookup
pub fn ticket_lookup_rules() -> RuleSet {
    RuleSet::new().rule(
        FieldRule::required("ticket", "Tiket")
            .check(Predicate::new("Format tiket tidak valid", is_lookup_ticket)),
    )
}
