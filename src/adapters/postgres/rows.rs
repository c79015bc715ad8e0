use std::str::FromStr;

use sqlx::{Row, postgres::PgRow};

use crate::domain::{
    BookId, BookStock, Fine, FineId, Loan, LoanId, MemberId, Payment, PaymentId, PaymentMethod,
    Reservation, ReservationId,
};
use crate::ports::unit_of_work::Result;

pub(super) fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

fn parse_status<T: FromStr<Err = String>>(row: &PgRow) -> Result<T> {
    let status: &str = row.get("status");
    T::from_str(status).map_err(invalid_data)
}

fn copies(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.get(column);
    u32::try_from(value).map_err(|_| invalid_data(format!("{} out of range: {}", column, value)))
}

/// 行データをBookStockに変換する（冊数の範囲も検証）
pub(super) fn map_row_to_stock(row: &PgRow) -> Result<BookStock> {
    let book_id = BookId::from_uuid(row.get("book_id"));
    let total = copies(row, "total_copies")?;
    let available = copies(row, "available_copies")?;

    BookStock::restore(book_id, total, available).map_err(|e| invalid_data(format!("{:?}", e)))
}

pub(super) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        member_id: MemberId::from_uuid(row.get("member_id")),
        borrowed_at: row.get("borrowed_at"),
        due_date: row.get("due_date"),
        returned_at: row.get("returned_at"),
        status: parse_status(row)?,
        fine_amount: row.get("fine_amount"),
    })
}

pub(super) fn map_row_to_fine(row: &PgRow) -> Result<Fine> {
    Ok(Fine {
        fine_id: FineId::from_uuid(row.get("fine_id")),
        member_id: MemberId::from_uuid(row.get("member_id")),
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        amount: row.get("amount"),
        status: parse_status(row)?,
        created_at: row.get("created_at"),
    })
}

pub(super) fn map_row_to_payment(row: &PgRow) -> Result<Payment> {
    let method: &str = row.get("method");
    let method = PaymentMethod::parse(method)
        .ok_or_else(|| invalid_data("blank payment method".to_string()))?;
    let loan_id: Option<uuid::Uuid> = row.get("loan_id");

    Ok(Payment {
        payment_id: PaymentId::from_uuid(row.get("payment_id")),
        member_id: MemberId::from_uuid(row.get("member_id")),
        loan_id: loan_id.map(LoanId::from_uuid),
        amount_paid: row.get("amount_paid"),
        method,
        paid_at: row.get("paid_at"),
    })
}

pub(super) fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    let loan_id: Option<uuid::Uuid> = row.get("loan_id");

    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.get("reservation_id")),
        member_id: MemberId::from_uuid(row.get("member_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        reserved_at: row.get("reserved_at"),
        expiry_date: row.get("expiry_date"),
        status: parse_status(row)?,
        loan_id: loan_id.map(LoanId::from_uuid),
    })
}
