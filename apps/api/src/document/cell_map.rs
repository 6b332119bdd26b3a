//! Where each field lands on the `APPLICATION` sheet.
//!
//! The form is laid out as two mirrored column blocks, groom on the left and
//! bride on the right. The blocks are not perfectly symmetric (the bride's
//! mother and giver surnames sit in AD, not AC), so every coordinate is listed
//! explicitly.

use thiserror::Error;

use crate::xlsx::{CellRef, InvalidCellRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Groom,
    Bride,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Groom, Side::Bride];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    MiddleName,
    LastName,
    BirthDate,
    Age,
    Residence,
    ResidenceCountry,
    Sex,
    Citizenship,
    FullAddress,
    AddressCountry,
    Religion,
    MaritalStatus,
    FatherFirst,
    FatherMiddle,
    FatherLast,
    MotherFirst,
    MotherMiddle,
    MotherLast,
    GiverFirst,
    GiverMiddle,
    GiverLast,
    GiverRelationship,
    GiverCitizenship,
    ExecutionDay,
    ExecutionMonth,
    ExecutionYear,
    PlaceOfExecution,
}

impl Field {
    /// Every field, in `CELL_MAP` order.
    pub const ALL: [Field; 28] = [
        Field::FirstName,
        Field::MiddleName,
        Field::LastName,
        Field::BirthDate,
        Field::Age,
        Field::Residence,
        Field::ResidenceCountry,
        Field::Sex,
        Field::Citizenship,
        Field::FullAddress,
        Field::AddressCountry,
        Field::Religion,
        Field::MaritalStatus,
        Field::FatherFirst,
        Field::FatherMiddle,
        Field::FatherLast,
        Field::MotherFirst,
        Field::MotherMiddle,
        Field::MotherLast,
        Field::GiverFirst,
        Field::GiverMiddle,
        Field::GiverLast,
        Field::GiverRelationship,
        Field::GiverCitizenship,
        Field::ExecutionDay,
        Field::ExecutionMonth,
        Field::ExecutionYear,
        Field::PlaceOfExecution,
    ];

    /// Fields of the consent/advice giver block, written only when it applies.
    pub fn is_giver(self) -> bool {
        matches!(
            self,
            Field::GiverFirst
                | Field::GiverMiddle
                | Field::GiverLast
                | Field::GiverRelationship
                | Field::GiverCitizenship
        )
    }

    /// A1 coordinate of the field for one side.
    pub fn address(self, side: Side) -> &'static str {
        let (_, groom, bride) = CELL_MAP[self as usize];
        match side {
            Side::Groom => groom,
            Side::Bride => bride,
        }
    }

    pub fn cell(self, side: Side) -> Result<CellRef, CellMapError> {
        let address = self.address(side);
        CellRef::parse(address).map_err(|source| CellMapError {
            field: self,
            side,
            source,
        })
    }
}

/// `(field, groom cell, bride cell)`, indexed by the field's discriminant.
pub const CELL_MAP: [(Field, &str, &str); 28] = [
    (Field::FirstName, "B8", "U8"),
    (Field::MiddleName, "B9", "U9"),
    (Field::LastName, "B10", "U10"),
    (Field::BirthDate, "B11", "U11"),
    (Field::Age, "N11", "AF11"),
    (Field::Residence, "B12", "U12"),
    (Field::ResidenceCountry, "L12", "AE12"),
    (Field::Sex, "B13", "U13"),
    (Field::Citizenship, "H13", "Z13"),
    (Field::FullAddress, "B15", "U15"),
    (Field::AddressCountry, "M15", "AF15"),
    (Field::Religion, "B16", "U16"),
    (Field::MaritalStatus, "B17", "U17"),
    (Field::FatherFirst, "B22", "U22"),
    (Field::FatherMiddle, "H22", "Y22"),
    (Field::FatherLast, "L22", "AC22"),
    (Field::MotherFirst, "B26", "U26"),
    (Field::MotherMiddle, "H26", "Y26"),
    (Field::MotherLast, "L26", "AD26"),
    (Field::GiverFirst, "B30", "U30"),
    (Field::GiverMiddle, "H30", "Y30"),
    (Field::GiverLast, "L30", "AD30"),
    (Field::GiverRelationship, "B31", "U31"),
    (Field::GiverCitizenship, "B32", "U32"),
    (Field::ExecutionDay, "B37", "U37"),
    (Field::ExecutionMonth, "E37", "W37"),
    (Field::ExecutionYear, "L37", "AD37"),
    (Field::PlaceOfExecution, "B38", "U38"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cell map entry {field:?} ({side:?}) is not a valid cell: {source}")]
pub struct CellMapError {
    pub field: Field,
    pub side: Side,
    #[source]
    pub source: InvalidCellRef,
}
