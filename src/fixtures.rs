// Small MIEMSS-shaped workbooks written in memory for loader and server tests

use rust_xlsxwriter::Workbook;

pub enum Value {
    Text(&'static str),
    Number(f64),
}

use Value::{Number, Text};

pub type Sheet = (&'static str, Vec<Vec<Value>>);

/// Workbook bytes with one worksheet per entry, first row as header
pub fn workbook(sheets: Vec<Sheet>) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                match value {
                    Text(s) => worksheet.write_string(r as u32, c as u16, *s).unwrap(),
                    Number(n) => worksheet.write_number(r as u32, c as u16, *n).unwrap(),
                };
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Padded acute headers, one unparseable bed count, a numeric region
pub fn acute_sheet() -> Sheet {
    (
        "Acute Hospitals",
        vec![
            vec![Text(" Hospital Name "), Text("County"), Text("Region"), Text("Num Bed ")],
            vec![Text("A"), Text("X"), Text("I"), Number(10.0)],
            vec![Text("B"), Text("Y"), Text("II"), Text("n/a")],
            vec![Text("C"), Text("Z"), Number(3.0), Number(20.0)],
        ],
    )
}

/// Positional PAC sheet; the second bed count is coerced to 0
pub fn pac_sheet() -> Sheet {
    (
        "PAC Hospitals",
        vec![
            vec![Text("Name"), Text("Cnty"), Text("EMS"), Text("Beds")],
            vec![Text("P1"), Text("Kent"), Text("V"), Number(9.0)],
            vec![Text("P2"), Text("Howard"), Text("III"), Text("--")],
        ],
    )
}

pub fn sample_workbook() -> Vec<u8> {
    workbook(vec![acute_sheet(), pac_sheet()])
}
