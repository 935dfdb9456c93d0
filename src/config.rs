use std::path::PathBuf;

use chrono::NaiveDate;

use crate::billing::BillingCalculator;

/// The static sender details printed on every invoice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Letterhead {
    pub organization: String,
    pub address: String,
    pub email: String,
    pub bank: String,
    pub branch: String,
}

impl Default for Letterhead {
    fn default() -> Self {
        Self {
            organization: "TechnoMedia Software Solutions Pvt. Ltd.".to_owned(),
            address: "CV Ramannagar, Bangalore, Karnataka - 560075".to_owned(),
            email: "info@technomediasoft.com".to_owned(),
            bank: "Indian Overseas Bank".to_owned(),
            branch: "Bangalore-560075".to_owned(),
        }
    }
}

/// Everything a batch run needs to know
///
/// The configuration is built once, usually from the command line, and handed
/// to every component by reference. Nothing in the crate reads global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceConfig {
    /// The student table
    pub input_path: PathBuf,
    /// Where invoices and verification images are written to
    pub output_dir: PathBuf,
    /// The logo printed at the top of every invoice
    pub logo_path: PathBuf,
    pub billing: BillingCalculator,
    /// Prepended to the student's phone number to form the invoice number
    pub invoice_prefix: String,
    pub invoice_date: NaiveDate,
    /// The description of the single invoice item, may span multiple lines
    pub item_description: String,
    pub letterhead: Letterhead,
    /// Edge length of the generated QR image in pixels
    pub verification_image_size: u32,
    /// Whether QR images stay next to the invoices after they were embedded
    pub retain_verification_images: bool,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("Students.csv"),
            output_dir: PathBuf::from("results"),
            logo_path: PathBuf::from("assets/logo.png"),
            billing: BillingCalculator::default(),
            invoice_prefix: "TMSS/2024-2025/DPSK/INV/".to_owned(),
            invoice_date: chrono::Local::now().date_naive(),
            item_description: "RouteAlert charges for Nov-2024\nNumber Of Students: 748".to_owned(),
            letterhead: Letterhead::default(),
            verification_image_size: 200,
            retain_verification_images: true,
        }
    }
}

impl InvoiceConfig {
    /// The invoice date in `dd-MMM-yyyy` form, e.g. `05-Nov-2024`
    pub fn formatted_date(&self) -> String {
        self.invoice_date.format("%d-%b-%Y").to_string()
    }
}
