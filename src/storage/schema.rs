//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building,
//! plus the DDL applied by `sqlite::migrate`.

use sea_query::Iden;

/// Receipts table schema.
#[derive(Iden)]
pub enum Sales {
    Table,
    Datetime,
    ReceiptNumber,
    PaymentType,
    TableNumber,
    SeatAmount,
    SummaryPrice,
    SubtotalBillDiscount,
    SubtotalSummaryPriceDiscountByItem,
    ExVat,
    BeforeVatSubtotalServiceCharge,
    CustomerName,
    PhoneNumber,
    Remark,
    BillOpenBy,
    BillCloseBy,
    Branch,
}

/// Line items table schema.
#[derive(Iden)]
pub enum SalesDetail {
    #[iden = "sales_detail"]
    Table,
    Datetime,
    ReceiptNumber,
    LineNumber,
    MenuCode,
    MenuName,
    Category,
    Quantity,
    PricePerUnit,
    SummaryPrice,
    Revenue,
    DiscountAmount,
    OrderType,
    Channel,
    TableNumber,
    BillOpenBy,
    BillCloseBy,
    Branch,
}

/// Lifetime per-item rollup schema.
#[derive(Iden)]
pub enum MenuSummaries {
    #[iden = "menu_summary"]
    Table,
    MenuCode,
    MenuName,
    Category,
    TotalQuantity,
    TotalRevenue,
    TotalDiscount,
    TimesOrdered,
}

/// Per-month per-item rollup schema.
#[derive(Iden)]
pub enum MonthlySummaries {
    #[iden = "monthly_summary"]
    Table,
    YearMonth,
    MenuCode,
    MenuName,
    Category,
    Quantity,
    Revenue,
    DiscountAmount,
    Orders,
}

/// Fact change log schema.
#[derive(Iden)]
pub enum FactChanges {
    Table,
    Seq,
    ReceiptNumber,
    MenuCode,
    YearMonth,
    RecordedAt,
}

/// Rollup checkpoint schema.
#[derive(Iden)]
pub enum RollupPositions {
    Table,
    Handler,
    Sequence,
    UpdatedAt,
}

/// SQL for creating the sales table.
pub const CREATE_SALES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales (
    datetime TEXT NOT NULL,
    receipt_number TEXT PRIMARY KEY,
    payment_type TEXT,
    table_number TEXT,
    seat_amount INTEGER,
    summary_price REAL,
    subtotal_bill_discount REAL,
    subtotal_summary_price_discount_by_item REAL,
    ex_vat REAL,
    before_vat_subtotal_service_charge REAL,
    customer_name TEXT,
    phone_number TEXT,
    remark TEXT,
    bill_open_by TEXT,
    bill_close_by TEXT,
    branch TEXT
)
"#;

/// SQL for creating the sales_detail table.
pub const CREATE_SALES_DETAIL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sales_detail (
    datetime TEXT NOT NULL,
    receipt_number TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    menu_code INTEGER NOT NULL,
    menu_name TEXT,
    category TEXT,
    quantity REAL NOT NULL,
    price_per_unit REAL NOT NULL,
    summary_price REAL NOT NULL,
    revenue REAL NOT NULL,
    discount_amount REAL NOT NULL,
    order_type TEXT,
    channel TEXT,
    table_number TEXT,
    bill_open_by TEXT,
    bill_close_by TEXT,
    branch TEXT,
    PRIMARY KEY (receipt_number, line_number),
    FOREIGN KEY (receipt_number) REFERENCES sales(receipt_number)
)
"#;

/// SQL for creating the menu_summary table.
pub const CREATE_MENU_SUMMARY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS menu_summary (
    menu_code INTEGER PRIMARY KEY,
    menu_name TEXT NOT NULL,
    category TEXT,
    total_quantity REAL NOT NULL,
    total_revenue REAL NOT NULL,
    total_discount REAL NOT NULL,
    times_ordered INTEGER NOT NULL
)
"#;

/// SQL for creating the monthly_summary table.
pub const CREATE_MONTHLY_SUMMARY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS monthly_summary (
    year_month TEXT NOT NULL,
    menu_code INTEGER NOT NULL,
    menu_name TEXT,
    category TEXT,
    quantity REAL NOT NULL,
    revenue REAL NOT NULL,
    discount_amount REAL NOT NULL,
    orders INTEGER NOT NULL,
    PRIMARY KEY (year_month, menu_code),
    FOREIGN KEY (menu_code) REFERENCES menu_summary(menu_code)
)
"#;

/// SQL for creating the fact change log.
pub const CREATE_FACT_CHANGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fact_changes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    receipt_number TEXT NOT NULL,
    menu_code INTEGER NOT NULL,
    year_month TEXT NOT NULL,
    recorded_at TEXT NOT NULL
)
"#;

/// SQL for creating the rollup checkpoint table.
pub const CREATE_ROLLUP_POSITIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rollup_positions (
    handler TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Secondary indexes.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sales_datetime ON sales(datetime)",
    "CREATE INDEX IF NOT EXISTS idx_sales_payment_type ON sales(payment_type)",
    "CREATE INDEX IF NOT EXISTS idx_sales_branch ON sales(branch)",
    "CREATE INDEX IF NOT EXISTS idx_detail_datetime ON sales_detail(datetime)",
    "CREATE INDEX IF NOT EXISTS idx_detail_receipt ON sales_detail(receipt_number)",
    "CREATE INDEX IF NOT EXISTS idx_detail_menu ON sales_detail(menu_code)",
    "CREATE INDEX IF NOT EXISTS idx_detail_category ON sales_detail(category)",
    "CREATE INDEX IF NOT EXISTS idx_menu_category ON menu_summary(category)",
    "CREATE INDEX IF NOT EXISTS idx_monthly_year_month ON monthly_summary(year_month)",
    "CREATE INDEX IF NOT EXISTS idx_monthly_category ON monthly_summary(category)",
    "CREATE INDEX IF NOT EXISTS idx_monthly_menu ON monthly_summary(menu_code)",
];

/// Every table, parents before children.
pub const CREATE_TABLES: &[&str] = &[
    CREATE_SALES_TABLE,
    CREATE_SALES_DETAIL_TABLE,
    CREATE_MENU_SUMMARY_TABLE,
    CREATE_MONTHLY_SUMMARY_TABLE,
    CREATE_FACT_CHANGES_TABLE,
    CREATE_ROLLUP_POSITIONS_TABLE,
];
