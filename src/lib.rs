pub use self::{
    billing::{format_money, AmountRange, BillingAmounts, BillingCalculator, BillingError},
    config::{InvoiceConfig, Letterhead},
    document::{DocumentError, PageBuilder, Weight},
    generator::{BatchSummary, FailedInvoice, InvoiceGenerator},
    invoice::{GeneratedInvoice, InvoiceAssembler, InvoiceError},
    roster::{load_roster, read_roster, Roster, RosterError},
    student::StudentRecord,
    verification::{verification_payload, write_verification_image, VerificationError},
};

mod billing;
mod config;
mod document;
mod generator;
mod invoice;
mod roster;
mod student;
mod verification;
