use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::billing::format_money;
use crate::document::{DocumentError, PageBuilder, Weight};
use crate::verification::{verification_payload, write_verification_image, VerificationError};
use crate::{BillingAmounts, InvoiceConfig, StudentRecord};

const TITLE_SIZE: f32 = 16.0;
const TEXT_SIZE: f32 = 12.0;
const LOGO_BOX: (f32, f32) = (200.0, 50.0);
const VERIFICATION_BOX: (f32, f32) = (100.0, 100.0);

/// Possible errors to occur while assembling a single invoice
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("Failed to read the logo {path}: {source}")]
    Logo {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("Failed to read the verification image: {0}")]
    ReadVerification(#[source] io::Error),
    #[error("Failed to write the invoice to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A successfully written invoice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedInvoice {
    student: StudentRecord,
    amounts: BillingAmounts,
    invoice_number: String,
    document: PathBuf,
    verification_image: Option<PathBuf>,
}

impl GeneratedInvoice {
    pub fn student(&self) -> &StudentRecord {
        &self.student
    }

    pub fn amounts(&self) -> &BillingAmounts {
        &self.amounts
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    /// Where the invoice was written to
    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Where the QR image was written to, if it was kept
    pub fn verification_image(&self) -> Option<&Path> {
        self.verification_image.as_deref()
    }
}

impl serde::Serialize for GeneratedInvoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        use serde::ser::SerializeStruct;
        let mut map = serializer.serialize_struct("GeneratedInvoice", 7)?;

        map.serialize_field("student_id", self.student.identifier())?;
        map.serialize_field("name", self.student.name())?;
        map.serialize_field("invoice_no", &self.invoice_number)?;
        map.serialize_field("base", &self.amounts.base())?;
        map.serialize_field("tax", &format_money(self.amounts.tax()))?;
        map.serialize_field("total", &format_money(self.amounts.total()))?;
        map.serialize_field("document", &self.document.display().to_string())?;

        map.end()
    }
}

/// Lays out and writes invoice documents
///
/// Every invoice is the same fixed stack of sections, only the student, the
/// invoice number and the amounts change.
#[derive(Debug)]
pub struct InvoiceAssembler<'c> {
    config: &'c InvoiceConfig,
}

impl<'c> InvoiceAssembler<'c> {
    pub fn new(config: &'c InvoiceConfig) -> Self {
        Self { config }
    }

    /// The invoice number of a student
    ///
    /// Derived from the phone number, so it is neither guaranteed to be unique
    /// nor to carry more than the prefix.
    pub fn invoice_number(&self, student: &StudentRecord) -> String {
        format!("{}{}", self.config.invoice_prefix, student.phone())
    }

    /// Writes the invoice of one student
    ///
    /// The document only appears at its final path once it is complete. The
    /// QR image is staged in a temporary file and only replaces an earlier one
    /// after the document was written, so a failure leaves the output of
    /// previous runs untouched.
    pub fn assemble(
        &self,
        student: &StudentRecord,
        amounts: &BillingAmounts,
    ) -> Result<GeneratedInvoice, InvoiceError> {
        let output_dir = &self.config.output_dir;
        let document = output_dir.join(student.invoice_file_name());
        let invoice_number = self.invoice_number(student);
        if student.phone().is_empty() {
            log::warn!(
                "Student {} has no phone number, the invoice number {} is not unique",
                student.identifier(), invoice_number,
            );
        }

        let (bytes, staged_image) = self.render(student, amounts, &invoice_number)?;
        persist(output_dir, &document, &bytes)?;

        // dropping the staged image deletes it
        let verification_image = match self.config.retain_verification_images {
            true => keep_verification_image(staged_image, output_dir.join(student.verification_file_name())),
            false => None,
        };

        Ok(GeneratedInvoice {
            student: student.clone(),
            amounts: *amounts,
            invoice_number,
            document,
            verification_image,
        })
    }

    fn render(
        &self,
        student: &StudentRecord,
        amounts: &BillingAmounts,
        invoice_number: &str,
    ) -> Result<(Vec<u8>, NamedTempFile), InvoiceError> {
        let config = self.config;
        let letterhead = &config.letterhead;
        let mut page = PageBuilder::new(&format!("Invoice {}", student.identifier()));

        // logo
        let logo = std::fs::read(&config.logo_path).map_err(|source| InvoiceError::Logo {
            path: config.logo_path.display().to_string(),
            source,
        })?;
        page.image_centered("logo", &logo, LOGO_BOX.0, LOGO_BOX.1)?;

        // header
        page.paragraph("INVOICE", TITLE_SIZE, Weight::Bold)
            .blank_line()
            .paragraph(&format!("Invoice No.: {}", invoice_number), TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Invoice Date: {}", config.formatted_date()), TEXT_SIZE, Weight::Normal)
            .blank_line();

        // sender
        page.paragraph("From:", TEXT_SIZE, Weight::Bold)
            .paragraph(&letterhead.organization, TEXT_SIZE, Weight::Normal)
            .paragraph(&letterhead.address, TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Email: {}", letterhead.email), TEXT_SIZE, Weight::Normal)
            .blank_line();

        // recipient
        page.paragraph(&format!("Bill To: {}", student.name()), TEXT_SIZE, Weight::Bold)
            .blank_line();

        // items
        page.table(
            &[
                vec!["Sl. No.".to_owned(), "Description".to_owned(), "Amount (Rs.)".to_owned()],
                vec!["1".to_owned(), config.item_description.clone(), amounts.base().to_string()],
            ],
            TEXT_SIZE,
        )
        .blank_line();

        // payment summary
        let tax_label = format!("IGST @ {}%", config.billing.tax_percent());
        page.paragraph("Other Charges:", TEXT_SIZE, Weight::Bold)
            .paragraph(&format!("Discount: Rs. {}", format_money(amounts.discount())), TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Subtotal: Rs. {}", format_money(amounts.subtotal())), TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("{}: Rs. {}", tax_label, format_money(amounts.tax())), TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Total: Rs. {} only", format_money(amounts.total())), TEXT_SIZE, Weight::Bold)
            .blank_line();

        // verification code
        let payload = verification_payload(student.identifier(), amounts.base());
        let staged_image = tempfile::Builder::new()
            .prefix("QR_")
            .suffix(".png")
            .tempfile_in(&config.output_dir)
            .map_err(|source| InvoiceError::Write {
                path: config.output_dir.join(student.verification_file_name()).display().to_string(),
                source,
            })?;
        write_verification_image(&payload, config.verification_image_size, staged_image.path())?;
        let qr = std::fs::read(staged_image.path()).map_err(InvoiceError::ReadVerification)?;
        page.image_centered("verification code", &qr, VERIFICATION_BOX.0, VERIFICATION_BOX.1)?
            .blank_line();

        // bank details
        page.paragraph("Bank Details:", TEXT_SIZE, Weight::Bold)
            .paragraph(&letterhead.organization, TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Bank: {}", letterhead.bank), TEXT_SIZE, Weight::Normal)
            .paragraph(&format!("Branch: {}", letterhead.branch), TEXT_SIZE, Weight::Normal)
            .blank_line();

        // signature
        page.paragraph(&format!("For {}", letterhead.organization), TEXT_SIZE, Weight::Bold)
            .paragraph("Authorized Signatory", TITLE_SIZE, Weight::Bold);

        Ok((page.finish(), staged_image))
    }
}

/// Writes `bytes` to a temporary file next to `path` and renames it into place
fn persist(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), InvoiceError> {
    let write_error = |source: io::Error| InvoiceError::Write {
        path: path.display().to_string(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
}

/// Moves a staged QR image to its final path
///
/// The image is already embedded in the written document, so failing to
/// keep a copy of it is not an error of the invoice.
fn keep_verification_image(staged: NamedTempFile, path: PathBuf) -> Option<PathBuf> {
    match staged.persist(&path) {
        Ok(_) => {
            log::debug!("QR code created: {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::warn!("Failed to keep verification image {}: {}", path.display(), e.error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::BillingCalculator;

    fn config(dir: &Path) -> InvoiceConfig {
        let logo_path = dir.join("logo.png");
        image::RgbImage::from_pixel(80, 20, image::Rgb([200, 30, 30]))
            .save(&logo_path)
            .unwrap();

        InvoiceConfig {
            output_dir: dir.join("results"),
            logo_path,
            invoice_date: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
            ..InvoiceConfig::default()
        }
    }

    fn student(identifier: &str, phone: &str) -> StudentRecord {
        StudentRecord::new("Asha Rao", identifier, phone).unwrap()
    }

    #[test]
    fn invoice_number_uses_phone() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let assembler = InvoiceAssembler::new(&config);
        assert_eq!(
            assembler.invoice_number(&student("ST001", "9845000001")),
            "TMSS/2024-2025/DPSK/INV/9845000001",
        );
        assert_eq!(
            assembler.invoice_number(&student("ST001", "")),
            "TMSS/2024-2025/DPSK/INV/",
        );
    }

    #[test]
    fn writes_document_and_verification_image() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(1200);

        let invoice = InvoiceAssembler::new(&config)
            .assemble(&student("ST 001", "9845000001"), &amounts)
            .unwrap();

        assert_eq!(invoice.document(), config.output_dir.join("Invoice_ST_001.pdf"));
        assert_eq!(
            invoice.verification_image(),
            Some(config.output_dir.join("QR_ST_001.png").as_path()),
        );
        assert_eq!(invoice.amounts().base(), 1200);
        let bytes = std::fs::read(invoice.document()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(invoice.verification_image().unwrap().exists());
        // only the two final files, no leftover temporary file
        assert_eq!(std::fs::read_dir(&config.output_dir).unwrap().count(), 2);
    }

    #[test]
    fn verification_image_can_be_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = InvoiceConfig {
            retain_verification_images: false,
            ..config(dir.path())
        };
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(800);

        let invoice = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "1"), &amounts)
            .unwrap();

        assert_eq!(invoice.verification_image(), None);
        assert!(invoice.document().exists());
        assert!(!config.output_dir.join("QR_ST001.png").exists());
        assert_eq!(std::fs::read_dir(&config.output_dir).unwrap().count(), 1);
    }

    #[test]
    fn missing_logo_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let config = InvoiceConfig {
            logo_path: dir.path().join("missing.jpg"),
            ..config(dir.path())
        };
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(800);

        let err = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "1"), &amounts)
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Logo { .. }));
        assert_eq!(std::fs::read_dir(&config.output_dir).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_logo_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(&config.logo_path, b"not an image").unwrap();
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(800);

        let err = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "1"), &amounts)
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Document(DocumentError::ImageDecode { .. })));
    }

    #[test]
    fn missing_output_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let amounts = BillingCalculator::default().amounts_for(800);

        let err = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "1"), &amounts)
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Write { .. }));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn document_sections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(1001);

        let invoice = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "42"), &amounts)
            .unwrap();
        let text = lopdf::Document::load(invoice.document())
            .unwrap()
            .extract_text(&[1])
            .unwrap();

        let expected = [
            "INVOICE",
            "Invoice No.: TMSS/2024-2025/DPSK/INV/42",
            "Invoice Date: 05-Nov-2024",
            "From:",
            "TechnoMedia Software Solutions Pvt. Ltd.",
            "CV Ramannagar, Bangalore, Karnataka - 560075",
            "Email: info@technomediasoft.com",
            "Bill To: Asha Rao",
            "Sl. No.",
            "Description",
            "Amount (Rs.)",
            "RouteAlert charges for Nov-2024",
            "Number Of Students: 748",
            "1001",
            "Other Charges:",
            "Discount: Rs. 0.00",
            "Subtotal: Rs. 1001.00",
            "IGST @ 18%: Rs. 180.18",
            "Total: Rs. 1181.18 only",
            "Bank Details:",
            "Bank: Indian Overseas Bank",
            "Branch: Bangalore-560075",
            "For TechnoMedia Software Solutions Pvt. Ltd.",
            "Authorized Signatory",
        ];
        let mut rest = text.as_str();
        for line in expected {
            let at = rest
                .find(line)
                .unwrap_or_else(|| panic!("{:?} missing or out of order in {:?}", line, text));
            rest = &rest[at + line.len()..];
        }
    }

    #[test]
    fn embedded_code_decodes_to_payload() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(1234);

        let invoice = InvoiceAssembler::new(&config)
            .assemble(&student("ST 001", "1"), &amounts)
            .unwrap();
        let image = image::open(invoice.verification_image().unwrap()).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            image.width() as usize,
            image.height() as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);
        let (_, content) = grids[0].decode().unwrap();

        assert_eq!(content, verification_payload("ST 001", 1234));
    }

    #[test]
    fn failed_rerun_keeps_earlier_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let assembler = InvoiceAssembler::new(&config);
        let student = student("ST001", "1");

        let first = assembler
            .assemble(&student, &BillingCalculator::default().amounts_for(800))
            .unwrap();
        let first_image = std::fs::read(first.verification_image().unwrap()).unwrap();
        std::fs::remove_file(&config.logo_path).unwrap();
        let err = assembler
            .assemble(&student, &BillingCalculator::default().amounts_for(900))
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Logo { .. }));
        assert!(first.document().exists());
        assert_eq!(std::fs::read(first.verification_image().unwrap()).unwrap(), first_image);
        assert_eq!(std::fs::read_dir(&config.output_dir).unwrap().count(), 2);
    }

    #[test]
    fn failure_after_staging_leaves_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let student = student("ST001", "1");
        // a directory in place of the document makes the final rename fail
        std::fs::create_dir(config.output_dir.join(student.invoice_file_name())).unwrap();

        let err = InvoiceAssembler::new(&config)
            .assemble(&student, &BillingCalculator::default().amounts_for(800))
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Write { .. }));
        assert_eq!(std::fs::read_dir(&config.output_dir).unwrap().count(), 1);
    }

    #[test]
    fn manifest_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir(&config.output_dir).unwrap();
        let amounts = BillingCalculator::default().amounts_for(1200);
        let invoice = InvoiceAssembler::new(&config)
            .assemble(&student("ST001", "42"), &amounts)
            .unwrap();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&invoice).unwrap();
        let manifest = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = manifest.lines();

        assert_eq!(lines.next(), Some("student_id,name,invoice_no,base,tax,total,document"));
        assert_eq!(
            lines.next(),
            Some(format!(
                "ST001,Asha Rao,TMSS/2024-2025/DPSK/INV/42,1200,216.00,1416.00,{}",
                invoice.document().display(),
            ).as_str()),
        );
    }
}
